// Tests for checked functions: arguments, results, return sites, and conditions
use std::sync::Arc;

use tether_core::{Location, ResponsibilityDirection, ViolationKind};
use tether_enforce::condition::ConditionSpec;
use tether_enforce::typed_function::FunctionSpec;
use tether_enforce::value::{ClassDef, ClassSpec, FunctionRef, NativeFunction};
use tether_enforce::{Annotation, Engine, Value};

use crate::common::{ints, site, violation};

#[test]
fn test_callback_result_blames_supplier() {
    let engine = Engine::new();
    let apply = engine
        .install(
            FunctionSpec::new("apply", |a| a[0].call(&[a[1].clone()], &Location::at("lib.py", 3)))
                .param("f", Annotation::callable(vec![Annotation::int()], Annotation::int()))
                .param("x", Annotation::int())
                .returns(Annotation::int())
                .at(Location::new("lib.py", 1, 3)),
        )
        .unwrap();

    let double = Value::native(NativeFunction::new("double", &["n"], |a| {
        Ok(Value::Int(a[0].as_int().unwrap_or(0) * 2))
    }));
    assert_eq!(apply.call(&[double, Value::Int(4)], &site(10)).unwrap().as_int(), Some(8));

    let shout = Value::native(NativeFunction::new("shout", &["n"], |a| {
        Ok(Value::str(&format!("{}!", a[0].repr())))
    }));
    let err = violation(apply.call(&[shout, Value::Int(4)], &site(11)));
    assert_eq!(err.expected, "int");
    assert_eq!(err.blamed(), Some(&site(11)));
}

#[test]
fn test_nested_return_sites() {
    let engine = Engine::new();
    let inner_ret = engine.register_return("calc.py", 3);
    let outer_ret = engine.register_return("calc.py", 23);

    let returns = Arc::clone(engine.returns());
    let inner = engine
        .install(
            FunctionSpec::new("inner", move |_| {
                returns.record(inner_ret);
                Ok(Value::Int(1))
            })
            .returns(Annotation::int())
            .at(Location::new("calc.py", 1, 5)),
        )
        .unwrap();

    let returns = Arc::clone(engine.returns());
    let outer = engine
        .install(
            FunctionSpec::new("outer", move |_| {
                let n = inner.call(&[], &Location::at("calc.py", 22))?;
                returns.record(outer_ret);
                Ok(Value::list(vec![n]))
            })
            .returns(Annotation::int())
            .at(Location::new("calc.py", 20, 5)),
        )
        .unwrap();

    let err = violation(outer.call(&[], &site(40)));
    assert_eq!(err.direction, ResponsibilityDirection::In);
    assert_eq!(err.blamed(), Some(&Location::at("calc.py", 23)));
}

#[test]
fn test_unrecorded_return_falls_back_to_declaration() {
    let engine = Engine::new();
    let elsewhere = engine.register_return("other.py", 8);
    let returns = Arc::clone(engine.returns());
    let f = engine
        .install(
            FunctionSpec::new("f", move |_| {
                returns.record(elsewhere);
                Ok(Value::str("x"))
            })
            .returns(Annotation::int())
            .at(Location::new("calc.py", 30, 4)),
        )
        .unwrap();
    let err = violation(f.call(&[], &site(41)));
    assert_eq!(err.blamed(), Some(&Location::at("calc.py", 30)));
}

#[test]
fn test_returned_container_is_wrapped() {
    let engine = Engine::new();
    let load = engine
        .install(
            FunctionSpec::new("load", |_| Ok(Value::list(vec![Value::Int(1), Value::str("two")])))
                .returns(Annotation::list(Annotation::int()))
                .at(Location::new("store.py", 5, 3)),
        )
        .unwrap();

    let xs = load.call(&[], &site(1)).unwrap();
    assert!(xs.is_proxy());
    let err = violation(xs.get_item(&Value::Int(1), &site(2)));
    assert_eq!(err.blamed(), Some(&site(2)));
    assert_eq!(err.responsible_locations().len(), 2);
    assert_eq!(err.responsible_locations()[1], &Location::at("store.py", 5));
}

#[test]
fn test_method_on_plain_instance() {
    let engine = Engine::new();
    let total = engine
        .install(
            FunctionSpec::new("total", |a| {
                let mut sum = 0;
                for v in a[1].iter_values(&Location::at("cart.py", 4))? {
                    sum += v.as_int().unwrap_or(0);
                }
                Ok(Value::Int(sum))
            })
            .method("Cart")
            .param("prices", Annotation::list(Annotation::int()))
            .returns(Annotation::int())
            .at(Location::new("cart.py", 2, 4)),
        )
        .unwrap();
    let cart = engine
        .define_class(ClassSpec::new("Cart", "shop").method("total", FunctionRef::Typed(total)))
        .unwrap();
    let c = ClassDef::instantiate(&cart, &[], &site(1)).unwrap();

    let sum = c.call_method("total", &[ints(&[1, 2, 3])], &site(2)).unwrap();
    assert_eq!(sum.as_int(), Some(6));

    let err = violation(c.call_method("total", &[Value::str("1")], &site(3)));
    assert_eq!(err.kind, ViolationKind::NotAContainer);
    assert_eq!(err.blamed(), Some(&site(3)));
}

#[test]
fn test_conditions_in_order() {
    let engine = Engine::new();
    let withdraw = engine
        .install(
            FunctionSpec::new("withdraw", |a| {
                Ok(Value::Int(a[0].as_int().unwrap_or(0) - a[1].as_int().unwrap_or(0)))
            })
            .param("balance", Annotation::int())
            .param("amount", Annotation::int())
            .returns(Annotation::int())
            .requires(ConditionSpec::new(&["amount"], "amount > 0", |v| {
                v[0].as_int().map_or(false, |n| n > 0)
            }))
            .ensures(ConditionSpec::new(&["ret"], "ret >= 0", |v| {
                v[0].as_int().map_or(false, |n| n >= 0)
            }))
            .at(Location::new("bank.py", 7, 4)),
        )
        .unwrap();

    assert_eq!(
        withdraw.call(&[Value::Int(10), Value::Int(4)], &site(1)).unwrap().as_int(),
        Some(6)
    );

    // Argument types are checked before preconditions.
    let err = violation(withdraw.call(&[Value::Int(10), Value::str("4")], &site(2)));
    assert_eq!(err.kind, ViolationKind::TypeMismatch);

    let err = violation(withdraw.call(&[Value::Int(10), Value::Int(-1)], &site(3)));
    assert_eq!(err.notes, vec!["Failed precondition.".to_string()]);
    assert_eq!(err.blamed(), Some(&site(3)));

    let err = violation(withdraw.call(&[Value::Int(1), Value::Int(4)], &site(4)));
    assert!(err.notes.iter().any(|n| n == "Failed postcondition"));
    assert_eq!(err.given.as_deref(), Some("ret=-3"));
    assert_eq!(err.blamed(), Some(&Location::at("bank.py", 7)));
}
