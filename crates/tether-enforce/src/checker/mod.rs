//! Checkers: compiled annotations.
//!
//! [`Checker`] is a closed sum over every annotation shape the registry can
//! compile. `check_and_wrap` either accepts the value as is, returns a proxy
//! that defers element checks, or reports a violation through the given
//! execution context.

mod annotated;
mod callable;
mod container;
mod forward;
mod interface;
mod literal;
mod simple;
mod tuple;
mod union;

use std::sync::Arc;

use tether_core::ContractError;

use crate::annotation::{BuiltinType, ContainerKind};
use crate::context::Ctx;
use crate::error::Error;
use crate::value::Value;

pub use annotated::AnnotatedChecker;
pub use callable::CallableChecker;
pub use container::ContainerChecker;
pub use forward::ForwardRefChecker;
pub use interface::{GenericChecker, InterfaceChecker};
pub use literal::LiteralChecker;
pub use simple::SimpleChecker;
pub use tuple::TupleChecker;
pub use union::UnionChecker;

/// What a checker claims to accept, for union disambiguation.
///
/// Every structural shape (interfaces, abstract containers) shares
/// [`BaseType::Interface`] and every callable shares [`BaseType::Callable`],
/// so a union may hold at most one of each.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseType {
    None,
    Builtin(BuiltinType),
    /// A user class, by address of its definition.
    Class(usize),
    Container(ContainerKind),
    Tuple,
    Callable,
    Interface,
}

/// Priority of structural shapes in a union; concrete types use 0.
pub(crate) const STRUCTURAL_PRIORITY: i32 = -1;

#[derive(Debug, Default)]
pub struct AnyChecker {
    /// Unbound type variables keep their name.
    pub name: Option<String>,
}

#[derive(Debug)]
pub enum Checker {
    Any(AnyChecker),
    None,
    Simple(SimpleChecker),
    Annotated(AnnotatedChecker),
    Literal(LiteralChecker),
    Union(UnionChecker),
    Tuple(TupleChecker),
    Callable(Arc<CallableChecker>),
    Container(Arc<ContainerChecker>),
    Interface(InterfaceChecker),
    Generic(GenericChecker),
    ForwardRef(ForwardRefChecker),
}

impl Checker {
    pub fn any() -> Arc<Checker> {
        Arc::new(Checker::Any(AnyChecker::default()))
    }

    /// Accept `value`, possibly returning a proxy around it, or report the
    /// violation through `ctx`.
    pub fn check_and_wrap(&self, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        match self {
            Checker::Any(_) => Ok(value),
            Checker::None if value.is_none() => Ok(value),
            Checker::None => Err(reject(&value, "None", ctx)),
            Checker::Simple(c) => c.check_and_wrap(value, ctx),
            Checker::Annotated(c) => c.check_and_wrap(value, ctx),
            Checker::Literal(c) => c.check_and_wrap(value, ctx),
            Checker::Union(c) => c.check_and_wrap(value, ctx),
            Checker::Tuple(c) => c.check_and_wrap(value, ctx),
            Checker::Callable(c) => CallableChecker::check_and_wrap(c, value, ctx),
            Checker::Container(c) => ContainerChecker::check_and_wrap(c, value, ctx),
            Checker::Interface(c) => c.check_and_wrap(value, ctx),
            Checker::Generic(c) => c.check_and_wrap(value, ctx),
            Checker::ForwardRef(c) => c.resolve()?.check_and_wrap(value, ctx),
        }
    }

    /// The type as shown in messages.
    pub fn describe(&self) -> String {
        match self {
            Checker::Any(c) => c.name.clone().unwrap_or_else(|| "Any".to_string()),
            Checker::None => "None".to_string(),
            Checker::Simple(c) => c.describe(),
            Checker::Annotated(c) => c.describe(),
            Checker::Literal(c) => c.describe(),
            Checker::Union(c) => c.describe(),
            Checker::Tuple(c) => c.describe(),
            Checker::Callable(c) => c.describe(),
            Checker::Container(c) => c.describe(),
            Checker::Interface(c) => c.describe(),
            Checker::Generic(c) => c.describe(),
            Checker::ForwardRef(c) => c.describe(),
        }
    }

    pub fn base_types(&self) -> Vec<BaseType> {
        match self {
            Checker::Any(_) | Checker::Literal(_) => Vec::new(),
            Checker::None => vec![BaseType::None],
            Checker::Simple(c) => vec![c.base_type()],
            Checker::Annotated(c) => c.inner().base_types(),
            Checker::Union(c) => c.alternatives().iter().flat_map(|a| a.base_types()).collect(),
            Checker::Tuple(_) => vec![BaseType::Tuple],
            Checker::Callable(_) => vec![BaseType::Callable],
            Checker::Container(c) => vec![c.base_type()],
            Checker::Interface(_) => vec![BaseType::Interface],
            Checker::Generic(c) => vec![c.base_type()],
            Checker::ForwardRef(c) => c.resolved().map(|r| r.base_types()).unwrap_or_default(),
        }
    }

    /// Higher runs first inside a union.
    pub fn priority(&self) -> i32 {
        match self {
            Checker::Interface(_) => STRUCTURAL_PRIORITY,
            Checker::Container(c) if c.kind.is_abstract() => STRUCTURAL_PRIORITY,
            Checker::Annotated(c) => c.inner().priority(),
            Checker::ForwardRef(c) => c.resolved().map(|r| r.priority()).unwrap_or(0),
            _ => 0,
        }
    }

    /// Whether an accepted value may come back as a different object.
    pub fn may_change_identity(&self) -> bool {
        match self {
            Checker::Any(_) | Checker::None | Checker::Literal(_) => false,
            Checker::Simple(c) => c.wraps_subclasses(),
            Checker::Annotated(c) => c.inner().may_change_identity(),
            Checker::Union(c) => c.alternatives().iter().any(|a| a.may_change_identity()),
            Checker::Tuple(c) => c.elements().iter().any(|e| e.may_change_identity()),
            Checker::Container(c) => !c.is_bare(),
            Checker::Callable(_)
            | Checker::Interface(_)
            | Checker::Generic(_)
            | Checker::ForwardRef(_) => true,
        }
    }
}

/// A plain type mismatch reported through `ctx`.
pub(crate) fn reject(value: &Value, expected: impl Into<String>, ctx: &Ctx) -> Error {
    ctx.wrap(ContractError::new(Some(value.repr()), expected)).into()
}
