use std::fmt;
use std::sync::Arc;

use tether_core::Location;

use crate::error::Error;
use crate::typed_function::TypedFunction;
use crate::value::Value;

/// Body of a host function. Receives every argument, `self` included.
pub type NativeFn = Arc<dyn Fn(&[Value]) -> Result<Value, Error> + Send + Sync>;

/// An unchecked host function.
pub struct NativeFunction {
    pub name: String,
    pub params: Vec<String>,
    pub location: Option<Location>,
    pub body: NativeFn,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        params: &[&str],
        body: impl Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params: params.iter().map(|p| p.to_string()).collect(),
            location: None,
            body: Arc::new(body),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("location", &self.location)
            .finish()
    }
}

/// A function value: either plain host code or a checked function.
#[derive(Clone, Debug)]
pub enum FunctionRef {
    Native(Arc<NativeFunction>),
    Typed(Arc<TypedFunction>),
}

impl FunctionRef {
    pub fn name(&self) -> &str {
        match self {
            FunctionRef::Native(f) => &f.name,
            FunctionRef::Typed(f) => f.name(),
        }
    }

    pub fn param_names(&self) -> Vec<String> {
        match self {
            FunctionRef::Native(f) => f.params.clone(),
            FunctionRef::Typed(f) => f.param_names(),
        }
    }

    pub fn location(&self) -> Option<Location> {
        match self {
            FunctionRef::Native(f) => f.location.clone(),
            FunctionRef::Typed(f) => f.location().cloned(),
        }
    }

    pub fn as_typed(&self) -> Option<&Arc<TypedFunction>> {
        match self {
            FunctionRef::Typed(f) => Some(f),
            FunctionRef::Native(_) => None,
        }
    }

    /// Call with every argument; `site` is where the call is written.
    pub fn call(&self, args: &[Value], site: &Location) -> Result<Value, Error> {
        match self {
            FunctionRef::Native(f) => (f.body)(args),
            FunctionRef::Typed(f) => f.call(args, site),
        }
    }

    pub fn ptr_eq(&self, other: &FunctionRef) -> bool {
        match (self, other) {
            (FunctionRef::Native(a), FunctionRef::Native(b)) => Arc::ptr_eq(a, b),
            (FunctionRef::Typed(a), FunctionRef::Typed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}
