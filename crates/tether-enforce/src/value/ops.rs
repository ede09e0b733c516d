//! Operations on host values.
//!
//! Raw containers are mutated in place. Proxies route every operation through
//! [`Proxy`](crate::proxy::Proxy), which checks extracted and inserted
//! elements and delegates the rest.

use std::cell::RefCell;
use std::rc::Rc;

use tether_core::Location;

use crate::context::GenericContext;
use crate::error::{Error, RuntimeError};
use crate::value::{BoundMethod, Value};

fn unsupported(op: &str, value: &Value) -> Error {
    RuntimeError::unsupported(op, &value.type_name()).into()
}

fn normalize_index(index: i64, len: usize, value: &Value) -> Result<usize, Error> {
    let i = if index < 0 { index + len as i64 } else { index };
    if i < 0 || i >= len as i64 {
        return Err(RuntimeError::IndexOutOfRange {
            type_name: value.type_name(),
            index,
        }
        .into());
    }
    Ok(i as usize)
}

fn int_key(key: &Value, value: &Value) -> Result<i64, Error> {
    key.as_int()
        .ok_or_else(|| unsupported(&format!("index with {}", key.type_name()), value))
}

/// Python slice bounds with clamping.
fn slice_bounds(len: usize, start: Option<i64>, stop: Option<i64>) -> (usize, usize) {
    let len = len as i64;
    let clamp = |i: i64| -> i64 {
        let i = if i < 0 { i + len } else { i };
        i.clamp(0, len)
    };
    let s = start.map(clamp).unwrap_or(0);
    let e = stop.map(clamp).unwrap_or(len);
    (s as usize, e.max(s) as usize)
}

fn find_key(pairs: &[(Value, Value)], key: &Value) -> Option<usize> {
    pairs.iter().position(|(k, _)| k.equals(key))
}

// Comparing elements borrows them, and an element may be the container
// itself. Searches run under a shared borrow that ends before any mutation.

fn key_position(pairs: &RefCell<Vec<(Value, Value)>>, key: &Value) -> Option<usize> {
    find_key(&pairs.borrow(), key)
}

fn item_position(items: &RefCell<Vec<Value>>, item: &Value) -> Option<usize> {
    items.borrow().iter().position(|v| v.equals(item))
}

impl Value {
    pub fn len(&self) -> Result<usize, Error> {
        match self {
            Value::Str(s) => Ok(s.chars().count()),
            Value::Tuple(items) => Ok(items.len()),
            Value::List(items) | Value::Set(items) => Ok(items.borrow().len()),
            Value::Dict(pairs) => Ok(pairs.borrow().len()),
            Value::Proxy(p) => p.inner().len(),
            other => Err(unsupported("len", other)),
        }
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    /// `item in self`. Never checks elements.
    pub fn contains(&self, item: &Value) -> Result<bool, Error> {
        match self {
            Value::Str(s) => match item {
                Value::Str(sub) => Ok(s.contains(&**sub)),
                other => Err(unsupported("in <str>", other)),
            },
            Value::Tuple(items) => Ok(items.iter().any(|v| v.equals(item))),
            Value::List(items) | Value::Set(items) => {
                Ok(items.borrow().iter().any(|v| v.equals(item)))
            }
            Value::Dict(pairs) => Ok(find_key(&pairs.borrow(), item).is_some()),
            Value::Proxy(p) => p.inner().contains(item),
            other => Err(unsupported("in", other)),
        }
    }

    /// `self[key]`
    pub fn get_item(&self, key: &Value, site: &Location) -> Result<Value, Error> {
        match self {
            Value::List(items) => {
                let items = items.borrow();
                let i = normalize_index(int_key(key, self)?, items.len(), self)?;
                Ok(items[i].clone())
            }
            Value::Tuple(items) => {
                let i = normalize_index(int_key(key, self)?, items.len(), self)?;
                Ok(items[i].clone())
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                let i = normalize_index(int_key(key, self)?, chars.len(), self)?;
                Ok(Value::str(&chars[i].to_string()))
            }
            Value::Dict(pairs) => {
                let pairs = pairs.borrow();
                find_key(&pairs, key)
                    .map(|i| pairs[i].1.clone())
                    .ok_or_else(|| RuntimeError::KeyNotFound(key.repr()).into())
            }
            Value::Proxy(p) => p.get_item(key, site),
            other => Err(unsupported("[]", other)),
        }
    }

    /// `self[key] = value`
    pub fn set_item(&self, key: Value, value: Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let i = normalize_index(int_key(&key, self)?, items.len(), self)?;
                items[i] = value;
                Ok(())
            }
            Value::Dict(pairs) => {
                match key_position(pairs, &key) {
                    Some(i) => pairs.borrow_mut()[i].1 = value,
                    None => pairs.borrow_mut().push((key, value)),
                }
                Ok(())
            }
            Value::Proxy(p) => p.set_item(key, value, site),
            other => Err(unsupported("[]=", other)),
        }
    }

    /// `del self[key]`
    pub fn del_item(&self, key: &Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let i = normalize_index(int_key(key, self)?, items.len(), self)?;
                items.remove(i);
                Ok(())
            }
            Value::Dict(pairs) => {
                let i = key_position(pairs, key)
                    .ok_or_else(|| Error::from(RuntimeError::KeyNotFound(key.repr())))?;
                pairs.borrow_mut().remove(i);
                Ok(())
            }
            Value::Proxy(p) => p.inner().del_item(key, site),
            other => Err(unsupported("del", other)),
        }
    }

    /// `self[start:stop]`, a new container of the same kind.
    pub fn slice(
        &self,
        start: Option<i64>,
        stop: Option<i64>,
        site: &Location,
    ) -> Result<Value, Error> {
        match self {
            Value::List(items) => {
                let items = items.borrow();
                let (s, e) = slice_bounds(items.len(), start, stop);
                Ok(Value::list(items[s..e].to_vec()))
            }
            Value::Tuple(items) => {
                let (s, e) = slice_bounds(items.len(), start, stop);
                Ok(Value::tuple(items[s..e].to_vec()))
            }
            Value::Str(text) => {
                let chars: Vec<char> = text.chars().collect();
                let (s, e) = slice_bounds(chars.len(), start, stop);
                Ok(Value::str(&chars[s..e].iter().collect::<String>()))
            }
            Value::Proxy(p) => p.slice(start, stop, site),
            other => Err(unsupported("slice", other)),
        }
    }

    pub fn append(&self, item: Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::List(items) => {
                items.borrow_mut().push(item);
                Ok(())
            }
            Value::Proxy(p) => p.append(item, site),
            other => Err(unsupported("append", other)),
        }
    }

    pub fn insert(&self, index: i64, item: Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                let len = items.len() as i64;
                let i = if index < 0 { index + len } else { index }.clamp(0, len);
                items.insert(i as usize, item);
                Ok(())
            }
            Value::Proxy(p) => p.insert(index, item, site),
            other => Err(unsupported("insert", other)),
        }
    }

    /// Append every element of `items`, one at a time.
    pub fn extend(&self, items: &Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::List(list) => {
                let new_items = items.iter_values(site)?;
                list.borrow_mut().extend(new_items);
                Ok(())
            }
            Value::Proxy(p) => p.extend(items, site),
            other => Err(unsupported("extend", other)),
        }
    }

    /// Remove and return the element at `index` (default: last). Sets pop
    /// their first element.
    pub fn pop(&self, index: Option<i64>, site: &Location) -> Result<Value, Error> {
        match self {
            Value::List(items) => {
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(RuntimeError::Empty("pop from empty list".to_string()).into());
                }
                let i = normalize_index(index.unwrap_or(-1), items.len(), self)?;
                Ok(items.remove(i))
            }
            Value::Set(items) => {
                let mut items = items.borrow_mut();
                if items.is_empty() {
                    return Err(RuntimeError::Empty("pop from an empty set".to_string()).into());
                }
                Ok(items.remove(0))
            }
            Value::Proxy(p) => p.pop(index, site),
            other => Err(unsupported("pop", other)),
        }
    }

    /// Remove the first element equal to `item`.
    pub fn remove(&self, item: &Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::List(items) | Value::Set(items) => {
                let i = item_position(items, item)
                    .ok_or_else(|| Error::from(RuntimeError::NotFound(item.repr())))?;
                items.borrow_mut().remove(i);
                Ok(())
            }
            Value::Proxy(p) => p.inner().remove(item, site),
            other => Err(unsupported("remove", other)),
        }
    }

    pub fn clear(&self) -> Result<(), Error> {
        match self {
            Value::List(items) | Value::Set(items) => {
                items.borrow_mut().clear();
                Ok(())
            }
            Value::Dict(pairs) => {
                pairs.borrow_mut().clear();
                Ok(())
            }
            Value::Proxy(p) => p.inner().clear(),
            other => Err(unsupported("clear", other)),
        }
    }

    /// `self.get(key, default)`
    pub fn get(&self, key: &Value, default: Value, site: &Location) -> Result<Value, Error> {
        match self {
            Value::Dict(pairs) => {
                let pairs = pairs.borrow();
                Ok(find_key(&pairs, key)
                    .map(|i| pairs[i].1.clone())
                    .unwrap_or(default))
            }
            Value::Proxy(p) => p.get(key, default, site),
            other => Err(unsupported("get", other)),
        }
    }

    /// `dict.pop(key[, default])`. A missing key without a default fails.
    pub fn pop_key(
        &self,
        key: &Value,
        default: Option<Value>,
        site: &Location,
    ) -> Result<Value, Error> {
        match self {
            Value::Dict(pairs) => match key_position(pairs, key) {
                Some(i) => Ok(pairs.borrow_mut().remove(i).1),
                None => default.ok_or_else(|| RuntimeError::KeyNotFound(key.repr()).into()),
            },
            Value::Proxy(p) => p.pop_key(key, default, site),
            other => Err(unsupported("pop", other)),
        }
    }

    /// Remove and return the most recently inserted pair as a 2-tuple.
    pub fn popitem(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Value::Dict(pairs) => {
                let (k, v) = pairs.borrow_mut().pop().ok_or_else(|| {
                    Error::from(RuntimeError::Empty(
                        "popitem(): dictionary is empty".to_string(),
                    ))
                })?;
                Ok(Value::tuple(vec![k, v]))
            }
            Value::Proxy(p) => p.popitem(site),
            other => Err(unsupported("popitem", other)),
        }
    }

    /// The value at `key`, inserting `default` first when absent.
    pub fn setdefault(&self, key: Value, default: Value, site: &Location) -> Result<Value, Error> {
        match self {
            Value::Dict(pairs) => match key_position(pairs, &key) {
                Some(i) => Ok(pairs.borrow()[i].1.clone()),
                None => {
                    pairs.borrow_mut().push((key, default.clone()));
                    Ok(default)
                }
            },
            Value::Proxy(p) => p.setdefault(key, default, site),
            other => Err(unsupported("setdefault", other)),
        }
    }

    pub fn keys(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Value::Dict(pairs) => {
                let keys: Vec<Value> = pairs.borrow().iter().map(|(k, _)| k.clone()).collect();
                Ok(Value::iterator(keys.into_iter()))
            }
            Value::Proxy(p) => p.keys(site),
            other => Err(unsupported("keys", other)),
        }
    }

    pub fn values(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Value::Dict(pairs) => {
                let values: Vec<Value> = pairs.borrow().iter().map(|(_, v)| v.clone()).collect();
                Ok(Value::iterator(values.into_iter()))
            }
            Value::Proxy(p) => p.values(site),
            other => Err(unsupported("values", other)),
        }
    }

    /// Key/value pairs as 2-tuples.
    pub fn items(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Value::Dict(pairs) => {
                let items: Vec<Value> = pairs
                    .borrow()
                    .iter()
                    .map(|(k, v)| Value::tuple(vec![k.clone(), v.clone()]))
                    .collect();
                Ok(Value::iterator(items.into_iter()))
            }
            Value::Proxy(p) => p.items(site),
            other => Err(unsupported("items", other)),
        }
    }

    /// Dict update from a mapping or an iterable of pairs; set update from
    /// any iterable.
    pub fn update(&self, other: &Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::Dict(_) => {
                for (k, v) in other.pairs(site)? {
                    self.set_item(k, v, site)?;
                }
                Ok(())
            }
            Value::Set(_) => {
                for item in other.iter_values(site)? {
                    self.add(item, site)?;
                }
                Ok(())
            }
            Value::Proxy(p) => p.update(other, site),
            value => Err(unsupported("update", value)),
        }
    }

    /// The key/value pairs of a mapping, or of an iterable of 2-tuples.
    pub(crate) fn pairs(&self, site: &Location) -> Result<Vec<(Value, Value)>, Error> {
        if let Value::Dict(pairs) = self.unwrap_proxy() {
            if !self.is_proxy() {
                return Ok(pairs.borrow().clone());
            }
        }
        let mut out = Vec::new();
        let source = if matches!(self.unwrap_proxy(), Value::Dict(_)) {
            self.items(site)?
        } else {
            self.clone()
        };
        for item in source.iter_values(site)? {
            match item.unwrap_proxy() {
                Value::Tuple(pair) if pair.len() == 2 => out.push((pair[0].clone(), pair[1].clone())),
                other => return Err(unsupported("update from non-pair", &other)),
            }
        }
        Ok(out)
    }

    /// Set insertion; a no-op when an equal element is present.
    pub fn add(&self, item: Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::Set(items) => {
                if item_position(items, &item).is_none() {
                    items.borrow_mut().push(item);
                }
                Ok(())
            }
            Value::Proxy(p) => p.add(item, site),
            other => Err(unsupported("add", other)),
        }
    }

    pub fn discard(&self, item: &Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::Set(items) => {
                if let Some(i) = item_position(items, item) {
                    items.borrow_mut().remove(i);
                }
                Ok(())
            }
            Value::Proxy(p) => p.inner().discard(item, site),
            other => Err(unsupported("discard", other)),
        }
    }

    /// A fresh iterator. Lists are iterated live; other containers are
    /// snapshotted. Iterators return themselves.
    pub fn iter(&self, site: &Location) -> Result<Value, Error> {
        match self {
            Value::List(items) => {
                let items = Rc::clone(items);
                let mut pos = 0;
                Ok(Value::iterator(std::iter::from_fn(move || {
                    let next = items.borrow().get(pos).cloned();
                    pos += 1;
                    next
                })))
            }
            Value::Tuple(items) => Ok(Value::iterator(items.to_vec().into_iter())),
            Value::Str(s) => {
                let chars: Vec<Value> = s.chars().map(|c| Value::str(&c.to_string())).collect();
                Ok(Value::iterator(chars.into_iter()))
            }
            Value::Set(items) => Ok(Value::iterator(items.borrow().clone().into_iter())),
            Value::Dict(_) => self.keys(site),
            Value::Iterator(_) => Ok(self.clone()),
            Value::Proxy(p) => p.iter(site),
            other => Err(unsupported("iter", other)),
        }
    }

    /// Advance an iterator.
    pub fn next(&self, site: &Location) -> Result<Option<Value>, Error> {
        match self {
            Value::Iterator(it) => {
                let next = it.borrow_mut().next_value();
                next.transpose()
            }
            Value::Proxy(p) => p.next(site),
            other => Err(unsupported("next", other)),
        }
    }

    /// Drain `iter(self)` into a vector.
    pub fn iter_values(&self, site: &Location) -> Result<Vec<Value>, Error> {
        let it = self.iter(site)?;
        let mut out = Vec::new();
        while let Some(v) = it.next(site)? {
            out.push(v);
        }
        Ok(out)
    }

    /// `self + other`. Containers are never element-checked here.
    pub fn concat(&self, other: &Value) -> Result<Value, Error> {
        match (self.unwrap_proxy(), other.unwrap_proxy()) {
            (Value::List(a), Value::List(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::list(items))
            }
            (Value::Tuple(a), Value::Tuple(b)) => {
                Ok(Value::tuple(a.iter().chain(b.iter()).cloned().collect()))
            }
            (Value::Str(a), Value::Str(b)) => Ok(Value::str(&format!("{a}{b}"))),
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(b)
                .map(Value::Int)
                .ok_or_else(|| RuntimeError::Overflow(format!("{a} + {b}")).into()),
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                Ok(Value::Float(a as f64 + b))
            }
            (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
            (a, _) => Err(unsupported("+", &a)),
        }
    }

    /// `self | other` for dicts (right wins) and sets.
    pub fn merge(&self, other: &Value) -> Result<Value, Error> {
        match (self.unwrap_proxy(), other.unwrap_proxy()) {
            (Value::Dict(a), Value::Dict(b)) => {
                let mut pairs = a.borrow().clone();
                pairs.extend(b.borrow().iter().cloned());
                Ok(Value::dict(pairs))
            }
            (Value::Set(a), Value::Set(b)) => {
                let mut items = a.borrow().clone();
                items.extend(b.borrow().iter().cloned());
                Ok(Value::set(items))
            }
            (a, _) => Err(unsupported("|", &a)),
        }
    }

    /// Attribute read. Methods come back bound to `self`.
    pub fn get_attr(&self, name: &str, site: &Location) -> Result<Value, Error> {
        match self {
            Value::Object(obj) => {
                if let Some(v) = obj.attr(name) {
                    return Ok(v);
                }
                if obj.class.find_method(name).is_some() {
                    return Ok(Value::Bound(Rc::new(BoundMethod {
                        receiver: self.clone(),
                        name: name.to_string(),
                    })));
                }
                Err(RuntimeError::NoAttribute {
                    type_name: self.type_name(),
                    name: name.to_string(),
                }
                .into())
            }
            Value::Proxy(p) => p.get_attr(self, name, site),
            other => Err(RuntimeError::NoAttribute {
                type_name: other.type_name(),
                name: name.to_string(),
            }
            .into()),
        }
    }

    /// Attribute write. Typed fields check the value and blame `site`.
    pub fn set_attr(&self, name: &str, value: Value, site: &Location) -> Result<(), Error> {
        match self {
            Value::Object(obj) => {
                let stored = match obj.class.find_field(name) {
                    Some(field) => {
                        let ctx = GenericContext::root(field.declared.clone(), Some(site.clone()));
                        field.checker.check_and_wrap(value, &ctx)?
                    }
                    None => value,
                };
                obj.store(name, stored);
                Ok(())
            }
            Value::Proxy(p) => p.inner().set_attr(name, value, site),
            other => Err(unsupported("setattr", other)),
        }
    }

    /// `self(*args)`
    pub fn call(&self, args: &[Value], site: &Location) -> Result<Value, Error> {
        match self {
            Value::Function(f) => f.call(args, site),
            Value::Bound(b) => b.receiver.call_method(&b.name, args, site),
            Value::Object(obj) if obj.class.find_method("__call__").is_some() => {
                self.call_method("__call__", args, site)
            }
            Value::Proxy(p) => p.call(args, site),
            other => Err(RuntimeError::NotCallable(other.type_name()).into()),
        }
    }

    /// `self.name(*args)`
    pub fn call_method(&self, name: &str, args: &[Value], site: &Location) -> Result<Value, Error> {
        match self {
            Value::Object(obj) => {
                if let Some(method) = obj.class.find_method(name) {
                    let mut full = Vec::with_capacity(args.len() + 1);
                    full.push(self.clone());
                    full.extend_from_slice(args);
                    return method.call(&full, site);
                }
                self.get_attr(name, site)?.call(args, site)
            }
            Value::Proxy(p) => p.call_method(name, args, site),
            other => Err(RuntimeError::NoAttribute {
                type_name: other.type_name(),
                name: name.to_string(),
            }
            .into()),
        }
    }
}
