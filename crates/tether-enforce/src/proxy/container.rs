use std::rc::Rc;
use std::sync::Arc;

use tether_core::Location;

use super::Proxy;
use crate::checker::ContainerChecker;
use crate::context::Ctx;
use crate::error::{Error, RuntimeError};
use crate::value::Value;

/// Iterate `source` lazily, checking each element with `checker`'s type
/// argument `index` as a read at `site`.
fn checked_iter(
    source: Value,
    checker: Arc<ContainerChecker>,
    index: usize,
    ctx: Ctx,
    site: &Location,
) -> Value {
    let site = site.clone();
    Value::checked_iterator(std::iter::from_fn(move || match source.next(&site) {
        Ok(Some(item)) => Some(checker.read(index, item, &site, &ctx)),
        Ok(None) => None,
        Err(e) => Some(Err(e)),
    }))
}

/// `list[T]` and `Sequence[T]`. Sequences are read-only.
pub struct SequenceProxy {
    pub(crate) inner: Value,
    pub(crate) checker: Arc<ContainerChecker>,
    pub(crate) ctx: Ctx,
    read_only: bool,
}

impl SequenceProxy {
    pub fn new(inner: Value, checker: Arc<ContainerChecker>, ctx: Ctx) -> Self {
        let read_only = checker.kind.is_abstract();
        Self {
            inner,
            checker,
            ctx,
            read_only,
        }
    }

    fn writable(&self, op: &str) -> Result<(), Error> {
        if self.read_only {
            return Err(RuntimeError::unsupported(op, &self.checker.describe()).into());
        }
        Ok(())
    }

    pub fn get_item(&self, key: &Value, site: &Location) -> Result<Value, Error> {
        let item = self.inner.get_item(key, site)?;
        self.checker.read(0, item, site, &self.ctx)
    }

    /// A sub-sequence under the same checker; its elements are checked only
    /// when read.
    pub fn slice(
        &self,
        start: Option<i64>,
        stop: Option<i64>,
        site: &Location,
    ) -> Result<Value, Error> {
        let sub = self.inner.slice(start, stop, site)?;
        let proxy = SequenceProxy::new(sub, Arc::clone(&self.checker), Rc::clone(&self.ctx));
        Ok(Value::Proxy(Rc::new(Proxy::Sequence(proxy))))
    }

    pub fn set_item(&self, key: Value, value: Value, site: &Location) -> Result<(), Error> {
        self.writable("[]=")?;
        self.checker.write(0, value.clone(), site)?;
        self.inner.set_item(key, value, site)
    }

    pub fn append(&self, item: Value, site: &Location) -> Result<(), Error> {
        self.writable("append")?;
        self.checker.write(0, item.clone(), site)?;
        self.inner.append(item, site)
    }

    pub fn insert(&self, index: i64, item: Value, site: &Location) -> Result<(), Error> {
        self.writable("insert")?;
        self.checker.write(0, item.clone(), site)?;
        self.inner.insert(index, item, site)
    }

    /// Elements are written one at a time; those before a rejected element
    /// stay written.
    pub fn extend(&self, items: &Value, site: &Location) -> Result<(), Error> {
        self.writable("extend")?;
        for item in items.iter_values(site)? {
            self.checker.write(0, item.clone(), site)?;
            self.inner.append(item, site)?;
        }
        Ok(())
    }

    pub fn pop(&self, index: Option<i64>, site: &Location) -> Result<Value, Error> {
        self.writable("pop")?;
        let item = self.inner.pop(index, site)?;
        self.checker.read(0, item, site, &self.ctx)
    }

    pub fn iter(&self, site: &Location) -> Result<Value, Error> {
        let source = self.inner.iter(site)?;
        Ok(checked_iter(
            source,
            Arc::clone(&self.checker),
            0,
            Rc::clone(&self.ctx),
            site,
        ))
    }
}

/// `dict[K, V]`.
pub struct MappingProxy {
    pub(crate) inner: Value,
    pub(crate) checker: Arc<ContainerChecker>,
    pub(crate) ctx: Ctx,
}

impl MappingProxy {
    pub fn new(inner: Value, checker: Arc<ContainerChecker>, ctx: Ctx) -> Self {
        Self {
            inner,
            checker,
            ctx,
        }
    }

    pub fn get_item(&self, key: &Value, site: &Location) -> Result<Value, Error> {
        let value = self.inner.get_item(key, site)?;
        self.checker.read(1, value, site, &self.ctx)
    }

    pub fn set_item(&self, key: Value, value: Value, site: &Location) -> Result<(), Error> {
        self.checker.write(0, key.clone(), site)?;
        self.checker.write(1, value.clone(), site)?;
        self.inner.set_item(key, value, site)
    }

    /// A present value is checked; the default is returned as given.
    pub fn get(&self, key: &Value, default: Value, site: &Location) -> Result<Value, Error> {
        if self.inner.contains(key)? {
            self.get_item(key, site)
        } else {
            Ok(default)
        }
    }

    /// Like [`get`](Self::get): a removed value is checked, the default is
    /// not.
    pub fn pop_key(
        &self,
        key: &Value,
        default: Option<Value>,
        site: &Location,
    ) -> Result<Value, Error> {
        if !self.inner.contains(key)? {
            return self.inner.pop_key(key, default, site);
        }
        let value = self.inner.pop_key(key, None, site)?;
        self.checker.read(1, value, site, &self.ctx)
    }

    pub fn popitem(&self, site: &Location) -> Result<Value, Error> {
        let pair = self.inner.popitem(site)?;
        let k = pair.get_item(&Value::Int(0), site)?;
        let v = pair.get_item(&Value::Int(1), site)?;
        let k = self.checker.read(0, k, site, &self.ctx)?;
        let v = self.checker.read(1, v, site, &self.ctx)?;
        Ok(Value::tuple(vec![k, v]))
    }

    /// A present value is read; an absent key and its default are written.
    pub fn setdefault(&self, key: Value, default: Value, site: &Location) -> Result<Value, Error> {
        if self.inner.contains(&key)? {
            return self.get_item(&key, site);
        }
        self.checker.write(0, key.clone(), site)?;
        self.checker.write(1, default.clone(), site)?;
        self.inner.setdefault(key, default, site)
    }

    pub fn keys(&self, site: &Location) -> Result<Value, Error> {
        let source = self.inner.keys(site)?;
        Ok(checked_iter(
            source,
            Arc::clone(&self.checker),
            0,
            Rc::clone(&self.ctx),
            site,
        ))
    }

    pub fn values(&self, site: &Location) -> Result<Value, Error> {
        let source = self.inner.values(site)?;
        Ok(checked_iter(
            source,
            Arc::clone(&self.checker),
            1,
            Rc::clone(&self.ctx),
            site,
        ))
    }

    pub fn items(&self, site: &Location) -> Result<Value, Error> {
        let source = self.inner.items(site)?;
        let checker = Arc::clone(&self.checker);
        let ctx = Rc::clone(&self.ctx);
        let site = site.clone();
        Ok(Value::checked_iterator(std::iter::from_fn(move || {
            let pair = match source.next(&site) {
                Ok(Some(pair)) => pair,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };
            let checked = (|| -> Result<Value, Error> {
                let k = pair.get_item(&Value::Int(0), &site)?;
                let v = pair.get_item(&Value::Int(1), &site)?;
                let k = checker.read(0, k, &site, &ctx)?;
                let v = checker.read(1, v, &site, &ctx)?;
                Ok(Value::tuple(vec![k, v]))
            })();
            Some(checked)
        })))
    }

    pub fn update(&self, other: &Value, site: &Location) -> Result<(), Error> {
        for (k, v) in other.pairs(site)? {
            self.set_item(k, v, site)?;
        }
        Ok(())
    }
}

/// `set[T]`.
pub struct SetProxy {
    pub(crate) inner: Value,
    pub(crate) checker: Arc<ContainerChecker>,
    pub(crate) ctx: Ctx,
}

impl SetProxy {
    pub fn new(inner: Value, checker: Arc<ContainerChecker>, ctx: Ctx) -> Self {
        Self {
            inner,
            checker,
            ctx,
        }
    }

    pub fn add(&self, item: Value, site: &Location) -> Result<(), Error> {
        self.checker.write(0, item.clone(), site)?;
        self.inner.add(item, site)
    }

    pub fn update(&self, other: &Value, site: &Location) -> Result<(), Error> {
        for item in other.iter_values(site)? {
            self.add(item, site)?;
        }
        Ok(())
    }

    pub fn pop(&self, site: &Location) -> Result<Value, Error> {
        let item = self.inner.pop(None, site)?;
        self.checker.read(0, item, site, &self.ctx)
    }

    pub fn iter(&self, site: &Location) -> Result<Value, Error> {
        let source = self.inner.iter(site)?;
        Ok(checked_iter(
            source,
            Arc::clone(&self.checker),
            0,
            Rc::clone(&self.ctx),
            site,
        ))
    }
}

/// `Iterable[T]` and `Iterator[T]`: checked one element at a time, so lazy
/// sources stay lazy.
pub struct IterableProxy {
    pub(crate) inner: Value,
    pub(crate) checker: Arc<ContainerChecker>,
    pub(crate) ctx: Ctx,
}

impl IterableProxy {
    pub fn new(inner: Value, checker: Arc<ContainerChecker>, ctx: Ctx) -> Self {
        Self {
            inner,
            checker,
            ctx,
        }
    }

    pub fn iter(&self, site: &Location) -> Result<Value, Error> {
        let source = self.inner.iter(site)?;
        Ok(checked_iter(
            source,
            Arc::clone(&self.checker),
            0,
            Rc::clone(&self.ctx),
            site,
        ))
    }

    pub fn next(&self, site: &Location) -> Result<Option<Value>, Error> {
        match self.inner.next(site)? {
            Some(item) => self.checker.read(0, item, site, &self.ctx).map(Some),
            None => Ok(None),
        }
    }
}
