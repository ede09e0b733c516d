//! The host values being checked.
//!
//! Containers are shared references so every alias observes a mutation, the
//! same way wrapped and unwrapped views of one list do in the checked program.
//! Operations that extract or insert elements live in [`ops`] and take the
//! call-site [`Location`](tether_core::Location) performing them.

mod function;
mod object;
mod ops;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub use function::{FunctionRef, NativeFn, NativeFunction};
pub use object::{BoundMethod, ClassDef, ClassSpec, FieldDef, FieldSpec, Object};

use crate::error::Error;
use crate::proxy::Proxy;

/// A lazily produced sequence of values.
pub struct ValueIter(Box<dyn Iterator<Item = Result<Value, Error>>>);

impl ValueIter {
    pub fn new(iter: impl Iterator<Item = Result<Value, Error>> + 'static) -> Self {
        ValueIter(Box::new(iter))
    }

    pub fn next_value(&mut self) -> Option<Result<Value, Error>> {
        self.0.next()
    }
}

impl fmt::Debug for ValueIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueIter")
    }
}

#[derive(Clone)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Tuple(Rc<[Value]>),
    List(Rc<RefCell<Vec<Value>>>),
    /// Insertion-ordered key/value pairs.
    Dict(Rc<RefCell<Vec<(Value, Value)>>>),
    /// Insertion-ordered, duplicate-free.
    Set(Rc<RefCell<Vec<Value>>>),
    Iterator(Rc<RefCell<ValueIter>>),
    Object(Rc<Object>),
    Function(FunctionRef),
    Bound(Rc<BoundMethod>),
    Proxy(Rc<Proxy>),
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Rc::from(items))
    }

    pub fn dict(pairs: Vec<(Value, Value)>) -> Self {
        let mut out: Vec<(Value, Value)> = Vec::with_capacity(pairs.len());
        for (k, v) in pairs {
            match out.iter_mut().find(|(existing, _)| existing.equals(&k)) {
                Some(slot) => slot.1 = v,
                None => out.push((k, v)),
            }
        }
        Value::Dict(Rc::new(RefCell::new(out)))
    }

    pub fn set(items: Vec<Value>) -> Self {
        let mut out: Vec<Value> = Vec::with_capacity(items.len());
        for item in items {
            if !out.iter().any(|v| v.equals(&item)) {
                out.push(item);
            }
        }
        Value::Set(Rc::new(RefCell::new(out)))
    }

    pub fn iterator(iter: impl Iterator<Item = Value> + 'static) -> Self {
        Value::Iterator(Rc::new(RefCell::new(ValueIter::new(iter.map(Ok)))))
    }

    pub(crate) fn checked_iterator(iter: impl Iterator<Item = Result<Value, Error>> + 'static) -> Self {
        Value::Iterator(Rc::new(RefCell::new(ValueIter::new(iter))))
    }

    pub fn native(function: NativeFunction) -> Self {
        Value::Function(FunctionRef::Native(std::sync::Arc::new(function)))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn is_proxy(&self) -> bool {
        matches!(self, Value::Proxy(_))
    }

    /// The original value behind a proxy, or the value itself.
    pub fn unwrap_proxy(&self) -> Value {
        match self {
            Value::Proxy(p) => p.inner().clone(),
            other => other.clone(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<Rc<Object>> {
        match self.unwrap_proxy() {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn type_name(&self) -> String {
        match self {
            Value::None => "NoneType".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Int(_) => "int".to_string(),
            Value::Float(_) => "float".to_string(),
            Value::Str(_) => "str".to_string(),
            Value::Tuple(_) => "tuple".to_string(),
            Value::List(_) => "list".to_string(),
            Value::Dict(_) => "dict".to_string(),
            Value::Set(_) => "set".to_string(),
            Value::Iterator(_) => "iterator".to_string(),
            Value::Object(o) => o.class.name.clone(),
            Value::Function(_) => "function".to_string(),
            Value::Bound(_) => "method".to_string(),
            Value::Proxy(p) => p.inner().type_name(),
        }
    }

    /// Python-style `repr`, used for the `given:` line of violations.
    pub fn repr(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => float_repr(*f),
            Value::Str(s) => str_repr(s),
            Value::Tuple(items) if items.len() == 1 => format!("({},)", items[0].repr()),
            Value::Tuple(items) => format!("({})", join_repr(items)),
            Value::List(items) => format!("[{}]", join_repr(&items.borrow())),
            Value::Dict(pairs) => {
                let items: Vec<String> = pairs
                    .borrow()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", items.join(", "))
            }
            Value::Set(items) if items.borrow().is_empty() => "set()".to_string(),
            Value::Set(items) => format!("{{{}}}", join_repr(&items.borrow())),
            Value::Iterator(_) => "<iterator>".to_string(),
            Value::Object(o) => o.repr(),
            Value::Function(f) => format!("<function {}>", f.name()),
            Value::Bound(b) => format!("<bound method {}.{}>", b.receiver.type_name(), b.name),
            Value::Proxy(p) => p.inner().repr(),
        }
    }

    /// Python `==`: structural for builtins, identity for objects. Proxies
    /// compare as the value they wrap.
    pub fn equals(&self, other: &Value) -> bool {
        let (a, b) = (self.unwrap_proxy(), other.unwrap_proxy());
        match (&a, &b) {
            (Value::None, Value::None) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
                (*x as f64) == *y
            }
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::Tuple(x), Value::Tuple(y)) => seq_equals(x, y),
            (Value::List(x), Value::List(y)) => {
                Rc::ptr_eq(x, y) || seq_equals(&x.borrow(), &y.borrow())
            }
            (Value::Set(x), Value::Set(y)) => {
                Rc::ptr_eq(x, y) || {
                    let (x, y) = (x.borrow(), y.borrow());
                    x.len() == y.len() && x.iter().all(|v| y.iter().any(|w| v.equals(w)))
                }
            }
            (Value::Dict(x), Value::Dict(y)) => {
                Rc::ptr_eq(x, y) || {
                    let (x, y) = (x.borrow(), y.borrow());
                    x.len() == y.len()
                        && x.iter().all(|(k, v)| {
                            y.iter().any(|(k2, v2)| k.equals(k2) && v.equals(v2))
                        })
                }
            }
            (Value::Bound(x), Value::Bound(y)) => x.name == y.name && x.receiver.same(&y.receiver),
            _ => a.same(&b),
        }
    }

    /// Python `is`, seen through proxies.
    pub fn same(&self, other: &Value) -> bool {
        match (self.unwrap_proxy(), other.unwrap_proxy()) {
            (Value::Tuple(a), Value::Tuple(b)) => Rc::ptr_eq(&a, &b),
            (Value::List(a), Value::List(b)) => Rc::ptr_eq(&a, &b),
            (Value::Dict(a), Value::Dict(b)) => Rc::ptr_eq(&a, &b),
            (Value::Set(a), Value::Set(b)) => Rc::ptr_eq(&a, &b),
            (Value::Iterator(a), Value::Iterator(b)) => Rc::ptr_eq(&a, &b),
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(&a, &b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(&b),
            (Value::Bound(a), Value::Bound(b)) => Rc::ptr_eq(&a, &b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::None, Value::None) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            _ => false,
        }
    }
}

fn seq_equals(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
}

fn join_repr(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

fn float_repr(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        f.to_string()
    }
}

fn str_repr(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::str(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repr() {
        assert_eq!(Value::str("x").repr(), "'x'");
        assert_eq!(Value::str("it's").repr(), "\"it's\"");
        assert_eq!(Value::Float(2.0).repr(), "2.0");
        assert_eq!(Value::Float(0.5).repr(), "0.5");
        assert_eq!(Value::tuple(vec![Value::Int(1)]).repr(), "(1,)");
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::str("x"), Value::None]).repr(),
            "[1, 'x', None]"
        );
        assert_eq!(
            Value::dict(vec![(Value::str("a"), Value::Bool(true))]).repr(),
            "{'a': True}"
        );
        assert_eq!(Value::set(vec![]).repr(), "set()");
    }

    #[test]
    fn test_equals_is_structural_for_builtins() {
        let a = Value::list(vec![Value::Int(1), Value::Float(2.0)]);
        let b = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert!(a.equals(&b));
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
    }

    #[test]
    fn test_constructors_deduplicate() {
        let s = Value::set(vec![Value::Int(1), Value::Int(1), Value::Int(2)]);
        assert_eq!(s.repr(), "{1, 2}");
        let d = Value::dict(vec![
            (Value::str("a"), Value::Int(1)),
            (Value::str("a"), Value::Int(2)),
        ]);
        assert_eq!(d.repr(), "{'a': 2}");
    }
}
