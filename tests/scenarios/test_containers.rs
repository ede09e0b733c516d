// Tests for parametric container checking through proxies
use tether_core::{ResponsibilityDirection, ViolationKind};
use tether_enforce::{Annotation, Engine, Value};

use crate::common::{ints, site, violation};

#[test]
fn test_read_of_bad_element_blames_reader() {
    let engine = Engine::new();
    let raw = Value::list(vec![Value::Int(1), Value::Int(2), Value::str("x")]);
    let xs = engine
        .check(&Annotation::list(Annotation::int()), raw, Some(site(1)), &site(2))
        .unwrap();

    assert_eq!(xs.get_item(&Value::Int(0), &site(3)).unwrap().as_int(), Some(1));
    assert_eq!(xs.get_item(&Value::Int(1), &site(3)).unwrap().as_int(), Some(2));

    let err = violation(xs.get_item(&Value::Int(2), &site(4)));
    assert_eq!(err.kind, ViolationKind::TypeMismatch);
    assert_eq!(err.direction, ResponsibilityDirection::In);
    assert_eq!(err.expected, "int");
    assert_eq!(err.blamed(), Some(&site(4)));
    assert_eq!(
        err.responsible_locations().first().copied(),
        Some(&site(4))
    );
}

#[test]
fn test_iteration_checks_lazily() {
    let engine = Engine::new();
    let raw = Value::list(vec![Value::Int(1), Value::str("x")]);
    let xs = engine
        .check(&Annotation::list(Annotation::int()), raw, None, &site(1))
        .unwrap();
    let it = xs.iter(&site(2)).unwrap();
    assert_eq!(it.next(&site(3)).unwrap().and_then(|v| v.as_int()), Some(1));
    // Blamed on the loop that started the iteration.
    let err = violation(it.next(&site(4)));
    assert_eq!(err.blamed(), Some(&site(2)));
}

#[test]
fn test_writes_reach_the_original() {
    let engine = Engine::new();
    let raw = ints(&[1]);
    let xs = engine
        .check(&Annotation::list(Annotation::int()), raw.clone(), None, &site(1))
        .unwrap();

    xs.append(Value::Int(2), &site(2)).unwrap();
    xs.set_item(Value::Int(0), Value::Int(7), &site(3)).unwrap();
    assert_eq!(raw.len().unwrap(), 2);
    assert_eq!(raw.get_item(&Value::Int(0), &site(4)).unwrap().as_int(), Some(7));
    assert!(xs.contains(&Value::Int(7)).unwrap());

    let err = violation(xs.set_item(Value::Int(1), Value::str("two"), &site(5)));
    assert_eq!(err.blamed(), Some(&site(5)));
    assert_eq!(raw.get_item(&Value::Int(1), &site(6)).unwrap().as_int(), Some(2));
}

#[test]
fn test_set_rejects_bad_member() {
    let engine = Engine::new();
    let raw = Value::set(vec![Value::str("a")]);
    let tags = engine
        .check(&Annotation::set(Annotation::str()), raw.clone(), None, &site(1))
        .unwrap();
    tags.add(Value::str("b"), &site(2)).unwrap();
    let err = violation(tags.add(Value::Int(3), &site(3)));
    assert_eq!(err.blamed(), Some(&site(3)));
    assert_eq!(raw.len().unwrap(), 2);
}

#[test]
fn test_fixed_tuple_is_checked_eagerly() {
    let engine = Engine::new();
    let ann = Annotation::tuple(vec![Annotation::int(), Annotation::str()]);
    let good = Value::tuple(vec![Value::Int(1), Value::str("a")]);
    assert!(engine.check(&ann, good, None, &site(1)).is_ok());

    let bad = Value::tuple(vec![Value::Int(1), Value::Int(2)]);
    let err = violation(engine.check(&ann, bad, Some(site(2)), &site(3)));
    assert_eq!(err.expected, "str");
    assert_eq!(err.context().map(|c| c.ty), Some("tuple[int, str]".to_string()));
    assert_eq!(err.blamed(), Some(&site(3)));

    let short = Value::tuple(vec![Value::Int(1)]);
    let err = violation(engine.check(&ann, short, None, &site(4)));
    assert_eq!(
        err.notes,
        vec!["expected a tuple of length 2, got length 1".to_string()]
    );
}

#[test]
fn test_nested_containers_wrap_on_read() {
    let engine = Engine::new();
    let ann = Annotation::list(Annotation::list(Annotation::int()));
    let raw = Value::list(vec![ints(&[1, 2]), Value::list(vec![Value::str("x")])]);
    let grid = engine.check(&ann, raw, Some(site(1)), &site(2)).unwrap();

    let first = grid.get_item(&Value::Int(0), &site(3)).unwrap();
    assert!(first.is_proxy());
    let row = grid.get_item(&Value::Int(1), &site(4)).unwrap();
    let err = violation(row.get_item(&Value::Int(0), &site(5)));
    assert_eq!(err.expected, "int");
    assert_eq!(err.blamed(), Some(&site(5)));
}

#[test]
fn test_rejected_mapping_writes_leave_original_unchanged() {
    let engine = Engine::new();
    let raw = Value::dict(vec![(Value::str("a"), Value::Int(1))]);
    let ann = Annotation::dict(Annotation::str(), Annotation::int());
    let scores = engine.check(&ann, raw.clone(), None, &site(1)).unwrap();

    let err = violation(scores.set_item(Value::str("b"), Value::str("two"), &site(2)));
    assert_eq!(err.blamed(), Some(&site(2)));
    let err = violation(scores.set_item(Value::Int(3), Value::Int(3), &site(3)));
    assert_eq!(err.expected, "str");
    assert_eq!(raw.repr(), "{'a': 1}");

    // Pairs before the rejected one stay written.
    let pairs = Value::list(vec![
        Value::tuple(vec![Value::str("c"), Value::Int(3)]),
        Value::tuple(vec![Value::str("d"), Value::str("four")]),
    ]);
    let err = violation(scores.update(&pairs, &site(4)));
    assert_eq!(err.blamed(), Some(&site(4)));
    assert_eq!(raw.repr(), "{'a': 1, 'c': 3}");
}

#[test]
fn test_rejected_set_writes_leave_original_unchanged() {
    let engine = Engine::new();
    let raw = Value::set(vec![Value::str("a")]);
    let tags = engine
        .check(&Annotation::set(Annotation::str()), raw.clone(), None, &site(1))
        .unwrap();

    violation(tags.add(Value::Int(3), &site(2)));
    assert!(!raw.contains(&Value::Int(3)).unwrap());
    assert_eq!(raw.len().unwrap(), 1);

    let more = Value::list(vec![Value::str("b"), Value::Int(4), Value::str("c")]);
    let err = violation(tags.update(&more, &site(3)));
    assert_eq!(err.blamed(), Some(&site(3)));
    assert!(raw.contains(&Value::str("b")).unwrap());
    assert!(!raw.contains(&Value::str("c")).unwrap());
    assert_eq!(raw.len().unwrap(), 2);
}

#[test]
fn test_extend_keeps_elements_before_rejection() {
    let engine = Engine::new();
    let raw = ints(&[1]);
    let xs = engine
        .check(&Annotation::list(Annotation::int()), raw.clone(), None, &site(1))
        .unwrap();
    let more = Value::list(vec![Value::Int(2), Value::str("x"), Value::Int(3)]);
    let err = violation(xs.extend(&more, &site(2)));
    assert_eq!(err.blamed(), Some(&site(2)));
    assert_eq!(raw.repr(), "[1, 2]");
}

#[test]
fn test_mapping_extraction_is_checked() {
    let engine = Engine::new();
    let raw = Value::dict(vec![
        (Value::str("a"), Value::str("bad")),
        (Value::str("b"), Value::Int(2)),
    ]);
    let ann = Annotation::dict(Annotation::str(), Annotation::int());
    let scores = engine.check(&ann, raw.clone(), Some(site(1)), &site(2)).unwrap();

    let err = violation(scores.pop_key(&Value::str("a"), None, &site(3)));
    assert_eq!(err.expected, "int");
    assert_eq!(err.blamed(), Some(&site(3)));
    assert_eq!(raw.len().unwrap(), 1);

    let fallback = scores
        .pop_key(&Value::str("z"), Some(Value::str("none")), &site(4))
        .unwrap();
    assert_eq!(fallback.repr(), "'none'");

    assert_eq!(
        scores
            .setdefault(Value::str("b"), Value::Int(0), &site(5))
            .unwrap()
            .as_int(),
        Some(2)
    );
    let err = violation(scores.setdefault(Value::str("c"), Value::str("zero"), &site(6)));
    assert_eq!(err.blamed(), Some(&site(6)));
    assert!(!raw.contains(&Value::str("c")).unwrap());

    raw.set_item(Value::str("e"), Value::None, &site(7)).unwrap();
    let err = violation(scores.popitem(&site(8)));
    assert_eq!(err.given.as_deref(), Some("None"));
    assert_eq!(err.blamed(), Some(&site(8)));
    assert_eq!(scores.popitem(&site(9)).unwrap().repr(), "('b', 2)");
}
