// Tests for union, optional, and literal checking
use tether_core::BuildErrorKind;
use tether_enforce::annotation::{InterfaceDef, LiteralValue, MethodDecl};
use tether_enforce::value::{ClassDef, ClassSpec};
use tether_enforce::{Annotation, Engine, Value};

use crate::common::{ints, site, violation};

#[test]
fn test_value_matching_neither_record() {
    let engine = Engine::new();
    let a = engine.define_class(ClassSpec::new("A", "records")).unwrap();
    let b = engine.define_class(ClassSpec::new("B", "records")).unwrap();
    let c = engine.define_class(ClassSpec::new("C", "records")).unwrap();
    let ann = Annotation::union(vec![Annotation::class(&a), Annotation::class(&b)]);

    let b_value = ClassDef::instantiate(&b, &[], &site(1)).unwrap();
    assert!(engine.check(&ann, b_value, None, &site(2)).is_ok());

    let c_value = ClassDef::instantiate(&c, &[], &site(1)).unwrap();
    let err = violation(engine.check(&ann, c_value, Some(site(3)), &site(4)));
    assert_eq!(err.expected, "Union[A, B]");
    let text = err.render();
    assert!(text.contains("expected: value of type Union[A, B]"));
    assert!(text.contains("caused by: app.py:4"));
}

#[test]
fn test_union_picks_alternative_by_shape() {
    let engine = Engine::new();
    let ann = Annotation::union(vec![Annotation::int(), Annotation::list(Annotation::int())]);

    let n = engine.check(&ann, Value::Int(3), None, &site(1)).unwrap();
    assert_eq!(n.as_int(), Some(3));

    let raw = Value::list(vec![Value::Int(1), Value::str("x")]);
    let xs = engine.check(&ann, raw, None, &site(2)).unwrap();
    assert!(xs.is_proxy());
    let err = violation(xs.get_item(&Value::Int(1), &site(3)));
    assert_eq!(err.expected, "int");
}

#[test]
fn test_overlapping_containers_are_rejected() {
    let engine = Engine::new();
    let err = engine
        .compile(&Annotation::union(vec![
            Annotation::list(Annotation::int()),
            Annotation::list(Annotation::str()),
        ]))
        .unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::AmbiguousUnion { .. }));
}

#[test]
fn test_two_interfaces_are_rejected() {
    let engine = Engine::new();
    let sized = engine.define_interface(
        InterfaceDef::new("Sized").method(MethodDecl::new("size").returns(Annotation::int())),
    );
    let closable = engine.define_interface(
        InterfaceDef::new("Closable").method(MethodDecl::new("close").returns(Annotation::None)),
    );
    let err = engine
        .compile(&Annotation::union(vec![
            Annotation::interface(&sized),
            Annotation::interface(&closable),
        ]))
        .unwrap_err();
    assert!(matches!(err.kind, BuildErrorKind::AmbiguousUnion { .. }));
}

#[test]
fn test_optional_list() {
    let engine = Engine::new();
    let ann = Annotation::optional(Annotation::list(Annotation::int()));
    assert!(engine.check(&ann, Value::None, None, &site(1)).unwrap().is_none());
    assert!(engine.check(&ann, ints(&[1]), None, &site(1)).unwrap().is_proxy());
    let err = violation(engine.check(&ann, Value::str("x"), None, &site(2)));
    assert_eq!(err.expected, "Optional[list[int]]");
}

#[test]
fn test_literal_values() {
    let engine = Engine::new();
    let mode = Annotation::literal(vec![LiteralValue::from("r"), LiteralValue::from("w")]);
    assert!(engine.check(&mode, Value::str("r"), None, &site(1)).is_ok());
    let err = violation(engine.check(&mode, Value::str("x"), None, &site(2)));
    assert_eq!(err.expected, "Literal['r', 'w']");
    assert_eq!(err.given.as_deref(), Some("'x'"));
}
