// Tests for the human-readable violation format
use std::sync::Arc;

use tether_core::error::RenderOptions;
use tether_core::source::SourceCache;
use tether_enforce::value::{ClassDef, ClassSpec};
use tether_enforce::{Annotation, Engine, Value};
use tether_output::human::HumanFormatter;
use tether_output::OutputFormatter;

use crate::common::{formatter, method, site, violation};

const APP: &str = "\
from lib import load
xs: list[int] = load()
total = 0
y = xs[2] + 1
";

#[test]
fn test_section_order() {
    let engine = Engine::new();
    let raw = Value::list(vec![Value::Int(1), Value::Int(2), Value::str("x")]);
    let xs = engine
        .check(&Annotation::list(Annotation::int()), raw, Some(site(2)), &site(2))
        .unwrap();
    let err = violation(xs.get_item(&Value::Int(2), &site(4)));

    let out = HumanFormatter::default().format_violation(&err);
    let given = out.find("given:").unwrap();
    let expected = out.find("expected: value of type int").unwrap();
    let context = out.find("context: list[int]").unwrap();
    let declared = out.find("declared at: app.py:2").unwrap();
    let caused = out.find("caused by: app.py:4").unwrap();
    assert!(given < expected && expected < context && context < declared && declared < caused);
}

#[test]
fn test_source_lines() {
    let engine = Engine::new();
    let raw = Value::list(vec![Value::Int(1), Value::Int(2), Value::str("x")]);
    let xs = engine
        .check(&Annotation::list(Annotation::int()), raw, Some(site(2)), &site(2))
        .unwrap();
    let err = violation(xs.get_item(&Value::Int(2), &site(4)));

    let sources = Arc::new(SourceCache::new());
    sources.insert("app.py", APP);
    let out = HumanFormatter::new(RenderOptions::default())
        .with_sources(sources)
        .format_violation(&err);
    assert!(out.contains("caused by: app.py:4\n  | y = xs[2] + 1"));
}

#[test]
fn test_boundary_rendered_before_violation() {
    let engine = Engine::new();
    let fmt = formatter(&engine);
    let echo = engine
        .define_class(
            ClassSpec::new("Echo", "echo").method("f", method("f", &["self", "x"], |a| Ok(a[1].clone()))),
        )
        .unwrap();
    let obj = ClassDef::instantiate(&echo, &[], &site(1)).unwrap();
    let proxy = engine
        .check(&Annotation::interface(&fmt), obj, None, &site(3))
        .unwrap();
    let err = violation(proxy.call_method("f", &[Value::Int(1)], &site(4)));

    let out = HumanFormatter::default().format_violation(&err);
    let boundary = out.find("Echo does not implement protocol Formatter").unwrap();
    let expected = out.find("expected: value of type str").unwrap();
    assert!(boundary < expected);
}
