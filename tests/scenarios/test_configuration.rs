// Tests for .tether/tether.json handling
use std::sync::Arc;

use tether_core::error::RenderOptions;
use tether_core::Location;
use tether_enforce::typed_function::FunctionSpec;
use tether_enforce::{Annotation, Engine, Value};
use tether_output::human::HumanFormatter;
use tether_output::OutputFormatter;

use crate::common::{engine_with_config, site, violation};

/// Blamed location of a bad return from a function that records its own
/// return, then one from somewhere else before control comes back.
fn blamed_after_forwarding(engine: &Engine) -> Location {
    let own = engine.register_return("calc.py", 12);
    let other = engine.register_return("helpers.py", 40);
    let returns = Arc::clone(engine.returns());
    let f = engine
        .install(
            FunctionSpec::new("f", move |_| {
                returns.record(own);
                returns.record(other);
                Ok(Value::str("x"))
            })
            .returns(Annotation::int())
            .at(Location::new("calc.py", 10, 6)),
        )
        .unwrap();
    let err = violation(f.call(&[], &site(1)));
    err.blamed().cloned().unwrap()
}

#[test]
fn test_default_lookback_sees_past_forwarding() {
    let engine = Engine::new();
    assert_eq!(blamed_after_forwarding(&engine), Location::at("calc.py", 12));
}

#[test]
fn test_lookback_of_one() {
    let (_dir, engine) = engine_with_config(r#"{"returns": {"lookback": 1}}"#);
    assert_eq!(blamed_after_forwarding(&engine), Location::at("calc.py", 10));
}

#[test]
fn test_lookback_is_at_least_one() {
    let (_dir, engine) = engine_with_config(r#"{"returns": {"lookback": 0}}"#);
    assert_eq!(engine.returns().lookback(), 1);
}

#[test]
fn test_invalid_config_uses_defaults() {
    let (_dir, engine) = engine_with_config("{ not json");
    assert_eq!(engine.returns().lookback(), 2);
    assert!(engine.config().cache.enabled);
    assert!(engine.config().checked_prefixes.is_empty());
}

#[test]
fn test_missing_config_uses_defaults() {
    let dir = tempfile::TempDir::new().unwrap();
    let engine = Engine::load(dir.path());
    assert_eq!(engine.returns().lookback(), 2);
}

#[test]
fn test_disabled_cache() {
    let (_dir, engine) = engine_with_config(r#"{"cache": {"enabled": false}}"#);
    let ann = Annotation::list(Annotation::int());
    engine.compile(&ann).unwrap();
    assert_eq!(engine.cache_len(), 0);
}

#[test]
fn test_render_settings_reach_formatter() {
    let (_dir, engine) =
        engine_with_config(r#"{"render": {"show_source": false, "max_given_chars": 5}}"#);
    let err = violation(engine.check(&Annotation::int(), Value::str("abcdefgh"), None, &site(2)));
    let fmt = HumanFormatter::new(RenderOptions::from(&engine.config().render));
    let out = fmt.format_violation(&err);
    assert!(out.contains("given:    'abcd...\n"));
}
