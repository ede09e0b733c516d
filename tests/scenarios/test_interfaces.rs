// Tests for structural interfaces and checked inheritance
use std::sync::Arc;

use tether_core::{Location, ResponsibilityDirection, ViolationKind};
use tether_enforce::annotation::{InterfaceDef, MethodDecl};
use tether_enforce::typed_function::FunctionSpec;
use tether_enforce::value::{ClassDef, ClassSpec, FunctionRef, NativeFunction};
use tether_enforce::{Annotation, Engine, Value};

use crate::common::{engine_with_config, formatter, method, site, violation};

#[test]
fn test_conforming_class_through_interface() {
    let engine = Engine::new();
    let fmt = formatter(&engine);
    let good = engine
        .define_class(ClassSpec::new("Good", "fmt").method(
            "f",
            method("f", &["self", "x"], |a| Ok(Value::str(&format!("<{}>", a[1].repr())))),
        ))
        .unwrap();
    let obj = ClassDef::instantiate(&good, &[], &site(1)).unwrap();
    let proxy = engine
        .check(&Annotation::interface(&fmt), obj, Some(site(2)), &site(3))
        .unwrap();

    let out = proxy.call_method("f", &[Value::Int(3)], &site(4)).unwrap();
    assert_eq!(out.as_str(), Some("<3>"));

    // Bound methods keep dispatching through the proxy.
    let bound = proxy.get_attr("f", &site(5)).unwrap();
    let err = violation(bound.call(&[Value::str("3")], &site(6)));
    assert_eq!(err.direction, ResponsibilityDirection::In);
    assert_eq!(err.blamed(), Some(&site(6)));
}

#[test]
fn test_missing_method_names_it() {
    let engine = Engine::new();
    let fmt = formatter(&engine);
    let empty = engine.define_class(ClassSpec::new("Empty", "fmt")).unwrap();
    let obj = ClassDef::instantiate(&empty, &[], &site(1)).unwrap();

    let err = violation(engine.check(&Annotation::interface(&fmt), obj, None, &site(2)));
    assert_eq!(err.kind, ViolationKind::MissingMethod);
    assert!(err.notes.iter().any(|n| n.contains("'f'")));
    assert!(err.render().starts_with("Empty does not implement protocol Formatter"));
}

#[test]
fn test_bad_return_blames_implementation() {
    let engine = Engine::new();
    let fmt = formatter(&engine);
    let body = NativeFunction::new("f", &["self", "x"], |a| Ok(a[1].clone()))
        .at(Location::new("echo.py", 20, 3));
    let echo = engine
        .define_class(ClassSpec::new("Echo", "echo").method("f", FunctionRef::Native(Arc::new(body))))
        .unwrap();
    let obj = ClassDef::instantiate(&echo, &[], &site(1)).unwrap();
    let proxy = engine
        .check(&Annotation::interface(&fmt), obj, Some(site(2)), &site(3))
        .unwrap();

    let err = violation(proxy.call_method("f", &[Value::Int(1)], &site(4)));
    assert_eq!(err.direction, ResponsibilityDirection::Out);
    assert_eq!(err.expected, "str");
    assert_eq!(err.blamed(), Some(&Location::at("echo.py", 20)));
    let boundary = err.previous_chain.as_deref().unwrap();
    assert_eq!(boundary.header, "Echo does not implement protocol Formatter");
    assert_eq!(boundary.blamed(), Some(&site(3)));
}

#[test]
fn test_generic_interface_binds_type_argument() {
    let engine = Engine::new();
    let source = engine.define_interface(
        InterfaceDef::new("Source")
            .type_param("T")
            .method(MethodDecl::new("read").returns(Annotation::typevar("T"))),
    );
    let file = engine
        .define_class(
            ClassSpec::new("TextFile", "io")
                .method("read", method("read", &["self"], |_| Ok(Value::str("line")))),
        )
        .unwrap();
    let obj = ClassDef::instantiate(&file, &[], &site(1)).unwrap();

    let text = engine
        .check(
            &Annotation::interface_of(&source, vec![Annotation::str()]),
            obj.clone(),
            None,
            &site(2),
        )
        .unwrap();
    assert_eq!(text.call_method("read", &[], &site(3)).unwrap().as_str(), Some("line"));

    let numbers = engine
        .check(
            &Annotation::interface_of(&source, vec![Annotation::int()]),
            obj,
            None,
            &site(4),
        )
        .unwrap();
    let err = violation(numbers.call_method("read", &[], &site(5)));
    assert_eq!(err.expected, "int");
    assert_eq!(err.direction, ResponsibilityDirection::Out);
}

#[test]
fn test_overriding_method_checked_in_owned_module() {
    let (_dir, engine) = engine_with_config(r#"{"checked_prefixes": ["zoo"]}"#);
    let speak = engine
        .install(
            FunctionSpec::new("speak", |_| Ok(Value::str("...")))
                .method("Animal")
                .param("times", Annotation::int())
                .returns(Annotation::str())
                .at(Location::new("zoo/animal.py", 4, 2)),
        )
        .unwrap();
    let animal = engine
        .define_class(ClassSpec::new("Animal", "zoo.animal").method("speak", FunctionRef::Typed(speak)))
        .unwrap();
    let bark = NativeFunction::new("speak", &["self", "times"], |a| Ok(a[1].clone()))
        .at(Location::new("zoo/dog.py", 9, 2));
    let dog = engine
        .define_class(
            ClassSpec::new("Dog", "zoo.dog")
                .base(&animal)
                .method("speak", FunctionRef::Native(Arc::new(bark))),
        )
        .unwrap();

    let rex = ClassDef::instantiate(&dog, &[], &site(1)).unwrap();
    let seen = engine
        .check(&Annotation::class(&animal), rex, None, &site(2))
        .unwrap();
    assert!(seen.is_proxy());

    let err = violation(seen.call_method("speak", &[Value::str("twice")], &site(3)));
    assert_eq!(err.direction, ResponsibilityDirection::In);
    assert_eq!(err.blamed(), Some(&site(3)));

    let err = violation(seen.call_method("speak", &[Value::Int(2)], &site(4)));
    assert_eq!(err.direction, ResponsibilityDirection::Out);
    assert_eq!(err.blamed(), Some(&Location::at("zoo/dog.py", 9)));
    assert_eq!(
        err.previous_chain.as_deref().map(|p| p.header.as_str()),
        Some("Dog does not implement parent class Animal")
    );
}
