//! Runtime contract enforcement for tether.
//!
//! Values are checked against declared [`Annotation`](annotation::Annotation)s
//! by [`Checker`](checker::Checker)s built once per annotation by the factory
//! registry. Containers, callables, and objects that cannot be checked eagerly
//! are wrapped in proxies that check each extracted or inserted element and
//! attach blame through a chain of execution contexts.
//!
//! The [`Engine`](engine::Engine) is the entry point: it compiles annotations,
//! checks values ad hoc, installs checked functions, and defines classes.

pub mod annotation;
pub mod checker;
pub mod condition;
pub mod context;
pub mod creation;
pub mod engine;
pub mod error;
pub mod proxy;
pub mod registry;
pub mod typed_function;
pub mod value;

pub use annotation::Annotation;
pub use engine::Engine;
pub use error::{Error, RuntimeError};
pub use value::Value;
