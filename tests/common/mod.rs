/// Shared test helpers for all tether integration tests.
///
/// Import from any integration test file with:
///   `#[path = "common/mod.rs"] mod common;`
use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use tether_core::{ContractError, Location};
use tether_enforce::annotation::{InterfaceDef, MethodDecl};
use tether_enforce::value::{FunctionRef, NativeFunction};
use tether_enforce::{Annotation, Engine, Error, Value};

/// A location in the checked program `app.py`.
#[allow(dead_code)]
pub fn site(line: u32) -> Location {
    Location::at("app.py", line)
}

/// Unwrap a contract violation, failing the test on any other outcome.
#[allow(dead_code)]
pub fn violation<T: std::fmt::Debug>(result: Result<T, Error>) -> ContractError {
    match result {
        Err(Error::Contract(err)) => *err,
        other => panic!("expected a contract violation, got {other:?}"),
    }
}

/// An engine configured from a `.tether/tether.json` holding `config`.
///
/// Returns (TempDir, Engine). Hold the TempDir to keep the directory alive.
#[allow(dead_code)]
pub fn engine_with_config(config: &str) -> (TempDir, Engine) {
    let dir = TempDir::new().unwrap();
    let tether_dir = dir.path().join(".tether");
    fs::create_dir_all(&tether_dir).unwrap();
    fs::write(tether_dir.join("tether.json"), config).unwrap();
    let engine = Engine::load(dir.path());
    (dir, engine)
}

/// A native method body.
#[allow(dead_code)]
pub fn method(
    name: &str,
    params: &[&str],
    body: impl Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
) -> FunctionRef {
    FunctionRef::Native(Arc::new(NativeFunction::new(name, params, body)))
}

/// `Formatter` with one method `f(self, x: int) -> str`, declared at
/// `fmt.py:2`.
#[allow(dead_code)]
pub fn formatter(engine: &Engine) -> Arc<InterfaceDef> {
    engine.define_interface(
        InterfaceDef::new("Formatter").method(
            MethodDecl::new("f")
                .param("x", Annotation::int())
                .returns(Annotation::str())
                .at(Location::new("fmt.py", 2, 2)),
        ),
    )
}

#[allow(dead_code)]
pub fn ints(values: &[i64]) -> Value {
    Value::list(values.iter().map(|v| Value::Int(*v)).collect())
}
