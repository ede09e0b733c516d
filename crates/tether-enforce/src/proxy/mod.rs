//! Identity-preserving wrappers.
//!
//! A proxy holds the original value, the checker that produced it, and the
//! execution context of the boundary where it was created. Operations that
//! extract or insert elements go through the checker; everything else is
//! forwarded to the original, so every alias observes the same state.

mod callable;
mod container;
mod dispatch;

use std::fmt;

use tether_core::Location;

use crate::context::Ctx;
use crate::error::{Error, RuntimeError};
use crate::value::Value;

pub use callable::CallableProxy;
pub use container::{IterableProxy, MappingProxy, SequenceProxy, SetProxy};
pub use dispatch::{CompiledMethod, DispatchKind, DispatchProxy, MethodTable};

pub enum Proxy {
    Sequence(SequenceProxy),
    Mapping(MappingProxy),
    Set(SetProxy),
    Iterable(IterableProxy),
    Callable(CallableProxy),
    Object(DispatchProxy),
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("declared", &self.describe())
            .field("inner", self.inner())
            .finish()
    }
}

impl Proxy {
    /// The original value.
    pub fn inner(&self) -> &Value {
        match self {
            Proxy::Sequence(p) => &p.inner,
            Proxy::Mapping(p) => &p.inner,
            Proxy::Set(p) => &p.inner,
            Proxy::Iterable(p) => &p.inner,
            Proxy::Callable(p) => &p.inner,
            Proxy::Object(p) => &p.inner,
        }
    }

    /// The execution context of the boundary that created this proxy.
    pub fn ctx(&self) -> &Ctx {
        match self {
            Proxy::Sequence(p) => &p.ctx,
            Proxy::Mapping(p) => &p.ctx,
            Proxy::Set(p) => &p.ctx,
            Proxy::Iterable(p) => &p.ctx,
            Proxy::Callable(p) => &p.ctx,
            Proxy::Object(p) => &p.ctx,
        }
    }

    /// The declared type this proxy enforces.
    pub fn describe(&self) -> String {
        match self {
            Proxy::Sequence(p) => p.checker.describe(),
            Proxy::Mapping(p) => p.checker.describe(),
            Proxy::Set(p) => p.checker.describe(),
            Proxy::Iterable(p) => p.checker.describe(),
            Proxy::Callable(p) => p.checker.describe(),
            Proxy::Object(p) => p.table.owner.clone(),
        }
    }

    pub(crate) fn get_item(&self, key: &Value, site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Sequence(p) => p.get_item(key, site),
            Proxy::Mapping(p) => p.get_item(key, site),
            _ => self.inner().get_item(key, site),
        }
    }

    pub(crate) fn set_item(&self, key: Value, value: Value, site: &Location) -> Result<(), Error> {
        match self {
            Proxy::Sequence(p) => p.set_item(key, value, site),
            Proxy::Mapping(p) => p.set_item(key, value, site),
            _ => self.inner().set_item(key, value, site),
        }
    }

    pub(crate) fn slice(
        &self,
        start: Option<i64>,
        stop: Option<i64>,
        site: &Location,
    ) -> Result<Value, Error> {
        match self {
            Proxy::Sequence(p) => p.slice(start, stop, site),
            _ => self.inner().slice(start, stop, site),
        }
    }

    pub(crate) fn append(&self, item: Value, site: &Location) -> Result<(), Error> {
        match self {
            Proxy::Sequence(p) => p.append(item, site),
            _ => self.inner().append(item, site),
        }
    }

    pub(crate) fn insert(&self, index: i64, item: Value, site: &Location) -> Result<(), Error> {
        match self {
            Proxy::Sequence(p) => p.insert(index, item, site),
            _ => self.inner().insert(index, item, site),
        }
    }

    pub(crate) fn extend(&self, items: &Value, site: &Location) -> Result<(), Error> {
        match self {
            Proxy::Sequence(p) => p.extend(items, site),
            _ => self.inner().extend(items, site),
        }
    }

    pub(crate) fn pop(&self, index: Option<i64>, site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Sequence(p) => p.pop(index, site),
            Proxy::Set(p) => p.pop(site),
            _ => self.inner().pop(index, site),
        }
    }

    pub(crate) fn get(&self, key: &Value, default: Value, site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Mapping(p) => p.get(key, default, site),
            _ => self.inner().get(key, default, site),
        }
    }

    pub(crate) fn pop_key(
        &self,
        key: &Value,
        default: Option<Value>,
        site: &Location,
    ) -> Result<Value, Error> {
        match self {
            Proxy::Mapping(p) => p.pop_key(key, default, site),
            _ => self.inner().pop_key(key, default, site),
        }
    }

    pub(crate) fn popitem(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Mapping(p) => p.popitem(site),
            _ => self.inner().popitem(site),
        }
    }

    pub(crate) fn setdefault(
        &self,
        key: Value,
        default: Value,
        site: &Location,
    ) -> Result<Value, Error> {
        match self {
            Proxy::Mapping(p) => p.setdefault(key, default, site),
            _ => self.inner().setdefault(key, default, site),
        }
    }

    pub(crate) fn keys(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Mapping(p) => p.keys(site),
            _ => self.inner().keys(site),
        }
    }

    pub(crate) fn values(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Mapping(p) => p.values(site),
            _ => self.inner().values(site),
        }
    }

    pub(crate) fn items(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Mapping(p) => p.items(site),
            _ => self.inner().items(site),
        }
    }

    pub(crate) fn update(&self, other: &Value, site: &Location) -> Result<(), Error> {
        match self {
            Proxy::Mapping(p) => p.update(other, site),
            Proxy::Set(p) => p.update(other, site),
            _ => self.inner().update(other, site),
        }
    }

    pub(crate) fn add(&self, item: Value, site: &Location) -> Result<(), Error> {
        match self {
            Proxy::Set(p) => p.add(item, site),
            _ => self.inner().add(item, site),
        }
    }

    pub(crate) fn iter(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Sequence(p) => p.iter(site),
            Proxy::Mapping(p) => p.keys(site),
            Proxy::Set(p) => p.iter(site),
            Proxy::Iterable(p) => p.iter(site),
            _ => self.inner().iter(site),
        }
    }

    pub(crate) fn next(&self, site: &Location) -> Result<Option<Value>, Error> {
        match self {
            Proxy::Iterable(p) => p.next(site),
            _ => self.inner().next(site),
        }
    }

    /// `this` is the proxy value itself, so bound methods keep dispatching
    /// through it.
    pub(crate) fn get_attr(&self, this: &Value, name: &str, site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Object(p) => p.get_attr(this, name, site),
            _ => self.inner().get_attr(name, site),
        }
    }

    pub(crate) fn call(&self, args: &[Value], site: &Location) -> Result<Value, Error> {
        match self {
            Proxy::Callable(p) => p.call(args, site),
            Proxy::Object(_) => self.call_method("__call__", args, site),
            _ => Err(RuntimeError::NotCallable(self.inner().type_name()).into()),
        }
    }

    pub(crate) fn call_method(
        &self,
        name: &str,
        args: &[Value],
        site: &Location,
    ) -> Result<Value, Error> {
        match self {
            Proxy::Object(p) => p.call_method(name, args, site),
            _ => self.inner().call_method(name, args, site),
        }
    }
}
