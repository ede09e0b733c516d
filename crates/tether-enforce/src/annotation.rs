//! The annotation algebra.
//!
//! Annotations are plain data describing a declared type. They are compiled
//! into [`Checker`](crate::checker::Checker)s by the registry; nothing here
//! inspects values except literal matching.

use std::fmt;
use std::sync::Arc;

use tether_core::Location;

use crate::value::{ClassDef, Value};

/// Predicate attached to an `Annotated` type.
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Int,
    Float,
    Str,
    Bool,
}

impl BuiltinType {
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinType::Int => "int",
            BuiltinType::Float => "float",
            BuiltinType::Str => "str",
            BuiltinType::Bool => "bool",
        }
    }

    /// `float` accepts `int`; `int` does not accept `bool`.
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (BuiltinType::Int, Value::Int(_))
                | (BuiltinType::Float, Value::Int(_) | Value::Float(_))
                | (BuiltinType::Str, Value::Str(_))
                | (BuiltinType::Bool, Value::Bool(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    List,
    Dict,
    Set,
    Sequence,
    Iterable,
    Iterator,
}

impl ContainerKind {
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::List => "list",
            ContainerKind::Dict => "dict",
            ContainerKind::Set => "set",
            ContainerKind::Sequence => "Sequence",
            ContainerKind::Iterable => "Iterable",
            ContainerKind::Iterator => "Iterator",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            ContainerKind::Dict => 2,
            _ => 1,
        }
    }

    /// Abstract kinds are matched structurally, like interfaces.
    pub fn is_abstract(&self) -> bool {
        matches!(
            self,
            ContainerKind::Sequence | ContainerKind::Iterable | ContainerKind::Iterator
        )
    }
}

/// A literal value usable in `Literal[...]`, defaults, and membership metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl LiteralValue {
    pub fn to_value(&self) -> Value {
        match self {
            LiteralValue::None => Value::None,
            LiteralValue::Bool(b) => Value::Bool(*b),
            LiteralValue::Int(i) => Value::Int(*i),
            LiteralValue::Float(f) => Value::Float(*f),
            LiteralValue::Str(s) => Value::str(s),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        self.to_value().equals(value)
    }

    pub fn repr(&self) -> String {
        self.to_value().repr()
    }
}

impl From<i64> for LiteralValue {
    fn from(v: i64) -> Self {
        LiteralValue::Int(v)
    }
}

impl From<&str> for LiteralValue {
    fn from(v: &str) -> Self {
        LiteralValue::Str(v.to_string())
    }
}

impl From<bool> for LiteralValue {
    fn from(v: bool) -> Self {
        LiteralValue::Bool(v)
    }
}

/// One metadata item of an `Annotated[T, ...]` type.
#[derive(Clone)]
pub enum Metadata {
    /// A predicate the value must satisfy; `source` is shown in messages.
    Predicate {
        check: Predicate,
        source: Option<String>,
    },
    /// The value must be one of these.
    Member(Vec<LiteralValue>),
    /// Descriptive text. A single info string names the type.
    Info(String),
}

impl Metadata {
    pub fn predicate(
        source: impl Into<String>,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
    ) -> Self {
        Metadata::Predicate {
            check: Arc::new(check),
            source: Some(source.into()),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Metadata::Predicate {
                source: Some(src), ..
            } => src.clone(),
            Metadata::Predicate { source: None, .. } => "<predicate>".to_string(),
            Metadata::Member(values) => members_repr(values),
            Metadata::Info(text) => format!("'{text}'"),
        }
    }
}

pub(crate) fn members_repr(values: &[LiteralValue]) -> String {
    let items: Vec<String> = values.iter().map(LiteralValue::repr).collect();
    format!("[{}]", items.join(", "))
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metadata::Predicate { source, .. } => {
                f.debug_struct("Predicate").field("source", source).finish()
            }
            Metadata::Member(values) => f.debug_tuple("Member").field(values).finish(),
            Metadata::Info(text) => f.debug_tuple("Info").field(text).finish(),
        }
    }
}

/// A parameter declared by an interface method. `None` means unannotated.
#[derive(Debug, Clone)]
pub struct ParamDecl {
    pub name: String,
    pub annotation: Option<Annotation>,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub ret: Option<Annotation>,
    pub declared: Option<Location>,
}

impl MethodDecl {
    /// A method taking `self` first.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: vec![ParamDecl {
                name: "self".to_string(),
                annotation: None,
            }],
            ret: None,
            declared: None,
        }
    }

    pub fn param(mut self, name: impl Into<String>, annotation: Annotation) -> Self {
        self.params.push(ParamDecl {
            name: name.into(),
            annotation: Some(annotation),
        });
        self
    }

    pub fn untyped_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamDecl {
            name: name.into(),
            annotation: None,
        });
        self
    }

    pub fn returns(mut self, annotation: Annotation) -> Self {
        self.ret = Some(annotation);
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.declared = Some(location);
        self
    }

    /// Whether any parameter or the return is annotated.
    pub fn is_typed(&self) -> bool {
        self.ret.is_some() || self.params.iter().any(|p| p.annotation.is_some())
    }
}

/// A structural interface: a named set of method signatures.
#[derive(Debug, Clone)]
pub struct InterfaceDef {
    pub name: String,
    pub type_params: Vec<String>,
    pub methods: Vec<MethodDecl>,
    pub declared: Option<Location>,
}

impl InterfaceDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_params: Vec::new(),
            methods: Vec::new(),
            declared: None,
        }
    }

    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.declared = Some(location);
        self
    }
}

/// A declared type.
#[derive(Debug, Clone)]
pub enum Annotation {
    Any,
    None,
    Builtin(BuiltinType),
    Class(Arc<ClassDef>),
    Annotated {
        inner: Box<Annotation>,
        metadata: Vec<Metadata>,
    },
    Interface {
        def: Arc<InterfaceDef>,
        args: Vec<Annotation>,
    },
    Generic {
        class: Arc<ClassDef>,
        args: Vec<Annotation>,
    },
    Container {
        kind: ContainerKind,
        args: Vec<Annotation>,
    },
    Callable {
        params: Vec<Annotation>,
        ret: Box<Annotation>,
    },
    Literal(Vec<LiteralValue>),
    Optional(Box<Annotation>),
    Union(Vec<Annotation>),
    Tuple(Vec<Annotation>),
    /// `tuple[T, ...]`
    VarTuple(Box<Annotation>),
    TypeVar(String),
    /// A type named by string, resolved lazily against the type environment.
    ForwardRef(String),
}

impl Annotation {
    pub fn int() -> Self {
        Annotation::Builtin(BuiltinType::Int)
    }
    pub fn float() -> Self {
        Annotation::Builtin(BuiltinType::Float)
    }
    pub fn str() -> Self {
        Annotation::Builtin(BuiltinType::Str)
    }
    pub fn bool() -> Self {
        Annotation::Builtin(BuiltinType::Bool)
    }

    fn container(kind: ContainerKind, args: Vec<Annotation>) -> Self {
        Annotation::Container { kind, args }
    }
    pub fn list(elem: Annotation) -> Self {
        Self::container(ContainerKind::List, vec![elem])
    }
    pub fn dict(key: Annotation, value: Annotation) -> Self {
        Self::container(ContainerKind::Dict, vec![key, value])
    }
    pub fn set(elem: Annotation) -> Self {
        Self::container(ContainerKind::Set, vec![elem])
    }
    pub fn sequence(elem: Annotation) -> Self {
        Self::container(ContainerKind::Sequence, vec![elem])
    }
    pub fn iterable(elem: Annotation) -> Self {
        Self::container(ContainerKind::Iterable, vec![elem])
    }
    pub fn iterator(elem: Annotation) -> Self {
        Self::container(ContainerKind::Iterator, vec![elem])
    }
    /// An unparameterized container; element types default to `Any`.
    pub fn bare(kind: ContainerKind) -> Self {
        Self::container(kind, Vec::new())
    }

    pub fn union(alternatives: Vec<Annotation>) -> Self {
        Annotation::Union(alternatives)
    }
    pub fn optional(inner: Annotation) -> Self {
        Annotation::Optional(Box::new(inner))
    }
    pub fn tuple(items: Vec<Annotation>) -> Self {
        Annotation::Tuple(items)
    }
    pub fn var_tuple(elem: Annotation) -> Self {
        Annotation::VarTuple(Box::new(elem))
    }
    pub fn callable(params: Vec<Annotation>, ret: Annotation) -> Self {
        Annotation::Callable {
            params,
            ret: Box::new(ret),
        }
    }
    pub fn literal(values: Vec<LiteralValue>) -> Self {
        Annotation::Literal(values)
    }
    pub fn annotated(inner: Annotation, metadata: Vec<Metadata>) -> Self {
        Annotation::Annotated {
            inner: Box::new(inner),
            metadata,
        }
    }
    pub fn class(def: &Arc<ClassDef>) -> Self {
        Annotation::Class(Arc::clone(def))
    }
    pub fn generic(class: &Arc<ClassDef>, args: Vec<Annotation>) -> Self {
        Annotation::Generic {
            class: Arc::clone(class),
            args,
        }
    }
    pub fn interface(def: &Arc<InterfaceDef>) -> Self {
        Annotation::Interface {
            def: Arc::clone(def),
            args: Vec::new(),
        }
    }
    pub fn interface_of(def: &Arc<InterfaceDef>, args: Vec<Annotation>) -> Self {
        Annotation::Interface {
            def: Arc::clone(def),
            args,
        }
    }
    pub fn typevar(name: impl Into<String>) -> Self {
        Annotation::TypeVar(name.into())
    }
    pub fn forward(name: impl Into<String>) -> Self {
        Annotation::ForwardRef(name.into())
    }

    /// Append a structural key to `out`. Shared definitions are keyed by
    /// address, so two distinct classes with one name never collide.
    pub fn write_cache_key(&self, out: &mut String) {
        fn list(out: &mut String, items: &[Annotation]) {
            out.push('[');
            for item in items {
                item.write_cache_key(out);
                out.push(',');
            }
            out.push(']');
        }
        match self {
            Annotation::Any => out.push_str("any"),
            Annotation::None => out.push_str("none"),
            Annotation::Builtin(b) => out.push_str(b.name()),
            Annotation::Class(def) => out.push_str(&format!("class@{:p}", Arc::as_ptr(def))),
            Annotation::Annotated { inner, metadata } => {
                out.push_str("annotated(");
                inner.write_cache_key(out);
                for m in metadata {
                    match m {
                        Metadata::Predicate { check, source } => out.push_str(&format!(
                            ";pred@{:p}:{}",
                            Arc::as_ptr(check) as *const u8,
                            source.as_deref().unwrap_or("")
                        )),
                        Metadata::Member(values) => {
                            out.push_str(";in:");
                            out.push_str(&members_repr(values));
                        }
                        Metadata::Info(text) => {
                            out.push_str(";info:");
                            out.push_str(text);
                        }
                    }
                }
                out.push(')');
            }
            Annotation::Interface { def, args } => {
                out.push_str(&format!("iface@{:p}", Arc::as_ptr(def)));
                list(out, args);
            }
            Annotation::Generic { class, args } => {
                out.push_str(&format!("generic@{:p}", Arc::as_ptr(class)));
                list(out, args);
            }
            Annotation::Container { kind, args } => {
                out.push_str(kind.name());
                list(out, args);
            }
            Annotation::Callable { params, ret } => {
                out.push_str("callable");
                list(out, params);
                ret.write_cache_key(out);
            }
            Annotation::Literal(values) => {
                out.push_str("literal");
                out.push_str(&members_repr(values));
            }
            Annotation::Optional(inner) => {
                out.push_str("optional(");
                inner.write_cache_key(out);
                out.push(')');
            }
            Annotation::Union(items) => {
                out.push_str("union");
                list(out, items);
            }
            Annotation::Tuple(items) => {
                out.push_str("tuple");
                list(out, items);
            }
            Annotation::VarTuple(inner) => {
                out.push_str("vartuple(");
                inner.write_cache_key(out);
                out.push(')');
            }
            Annotation::TypeVar(name) => {
                out.push_str("typevar:");
                out.push_str(name);
            }
            Annotation::ForwardRef(name) => {
                out.push_str("ref:");
                out.push_str(name);
            }
        }
    }

    pub fn cache_key(&self) -> String {
        let mut out = String::new();
        self.write_cache_key(&mut out);
        out
    }
}

fn join(items: &[Annotation]) -> String {
    items
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Any => f.write_str("Any"),
            Annotation::None => f.write_str("None"),
            Annotation::Builtin(b) => f.write_str(b.name()),
            Annotation::Class(def) => f.write_str(&def.name),
            Annotation::Annotated { inner, metadata } => {
                let meta: Vec<String> = metadata.iter().map(Metadata::describe).collect();
                write!(f, "Annotated[{inner}, {}]", meta.join(", "))
            }
            Annotation::Interface { def, args } if args.is_empty() => f.write_str(&def.name),
            Annotation::Interface { def, args } => write!(f, "{}[{}]", def.name, join(args)),
            Annotation::Generic { class, args } => write!(f, "{}[{}]", class.name, join(args)),
            Annotation::Container { kind, args } if args.is_empty() => f.write_str(kind.name()),
            Annotation::Container { kind, args } => write!(f, "{}[{}]", kind.name(), join(args)),
            Annotation::Callable { params, ret } => {
                write!(f, "Callable[[{}], {ret}]", join(params))
            }
            Annotation::Literal(values) => {
                let items: Vec<String> = values.iter().map(LiteralValue::repr).collect();
                write!(f, "Literal[{}]", items.join(", "))
            }
            Annotation::Optional(inner) => write!(f, "Optional[{inner}]"),
            Annotation::Union(items) => write!(f, "Union[{}]", join(items)),
            Annotation::Tuple(items) => write!(f, "tuple[{}]", join(items)),
            Annotation::VarTuple(inner) => write!(f, "tuple[{inner}, ...]"),
            Annotation::TypeVar(name) => f.write_str(name),
            Annotation::ForwardRef(name) => f.write_str(name),
        }
    }
}
