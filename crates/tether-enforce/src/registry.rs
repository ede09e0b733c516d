//! The checker factory registry.
//!
//! Factories are tried in [`FACTORY_ORDER`], most specific first; the first
//! one recognizing an annotation builds its checker, recursing through
//! [`CreationContext::find_checker`] for nested type arguments. Results are
//! memoized per annotation and context in a [`CheckerCache`].

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tether_core::{BuildError, BuildErrorKind};

use crate::annotation::Annotation;
use crate::checker::{
    AnnotatedChecker, AnyChecker, CallableChecker, Checker, ContainerChecker, ForwardRefChecker,
    GenericChecker, InterfaceChecker, LiteralChecker, SimpleChecker, TupleChecker, UnionChecker,
};
use crate::creation::CreationContext;

/// Process-wide memo of compiled checkers.
///
/// Entries are idempotent to rebuild, so two threads racing on the same key
/// at worst compile it twice.
#[derive(Debug, Default)]
pub struct CheckerCache {
    entries: Mutex<HashMap<u64, Arc<Checker>>>,
}

impl CheckerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: u64) -> Option<Arc<Checker>> {
        self.entries.lock().get(&key).cloned()
    }

    pub fn insert(&self, key: u64, checker: Arc<Checker>) {
        self.entries.lock().insert(key, checker);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Factory {
    Any,
    None,
    Annotated,
    Interface,
    /// Parametric containers, generic user classes, and type variables.
    Generic,
    Callable,
    Literal,
    Optional,
    Union,
    Tuple,
    ForwardRef,
    /// Builtins and plain classes.
    Simple,
}

pub const FACTORY_ORDER: [Factory; 12] = [
    Factory::Any,
    Factory::None,
    Factory::Annotated,
    Factory::Interface,
    Factory::Generic,
    Factory::Callable,
    Factory::Literal,
    Factory::Optional,
    Factory::Union,
    Factory::Tuple,
    Factory::ForwardRef,
    Factory::Simple,
];

impl Factory {
    pub fn name(&self) -> &'static str {
        match self {
            Factory::Any => "any",
            Factory::None => "none",
            Factory::Annotated => "annotated",
            Factory::Interface => "interface",
            Factory::Generic => "generic",
            Factory::Callable => "callable",
            Factory::Literal => "literal",
            Factory::Optional => "optional",
            Factory::Union => "union",
            Factory::Tuple => "tuple",
            Factory::ForwardRef => "forward_ref",
            Factory::Simple => "simple",
        }
    }

    /// `None` if this factory does not recognize `annotation`.
    pub fn create(
        &self,
        annotation: &Annotation,
        ctx: &CreationContext,
    ) -> Option<Result<Arc<Checker>, BuildError>> {
        let built = match (self, annotation) {
            (Factory::Any, Annotation::Any) => Ok(Checker::Any(AnyChecker::default())),
            (Factory::None, Annotation::None) => Ok(Checker::None),
            (Factory::Annotated, Annotation::Annotated { inner, metadata }) => {
                AnnotatedChecker::build(inner, metadata, ctx).map(Checker::Annotated)
            }
            (Factory::Interface, Annotation::Interface { def, args }) => {
                InterfaceChecker::build(def, args, ctx).map(Checker::Interface)
            }
            (Factory::Generic, Annotation::Container { kind, args }) => {
                ContainerChecker::build(*kind, args, ctx).map(|c| Checker::Container(Arc::new(c)))
            }
            (Factory::Generic, Annotation::Generic { class, args }) => {
                GenericChecker::build(class, args, ctx).map(Checker::Generic)
            }
            // A bound variable is its binding's checker, shared.
            (Factory::Generic, Annotation::TypeVar(name)) => match ctx.resolve_typevar(name) {
                Some((bound, outer)) => return Some(outer.find_checker(&bound)),
                None => Ok(Checker::Any(AnyChecker {
                    name: Some(name.clone()),
                })),
            },
            (Factory::Callable, Annotation::Callable { params, ret }) => {
                CallableChecker::build(params, ret, ctx).map(|c| Checker::Callable(Arc::new(c)))
            }
            (Factory::Literal, Annotation::Literal(values)) => {
                LiteralChecker::build(values, ctx).map(Checker::Literal)
            }
            (Factory::Optional, Annotation::Optional(inner)) => optional(inner, ctx),
            // `Union[T, None]` is `Optional[T]`.
            (Factory::Optional, Annotation::Union(items))
                if items.len() == 2 && items.iter().any(|a| matches!(a, Annotation::None)) =>
            {
                let inner = items.iter().find(|a| !matches!(a, Annotation::None))?;
                optional(inner, ctx)
            }
            (Factory::Union, Annotation::Union(items)) => union(items, ctx),
            (Factory::Tuple, Annotation::Tuple(items)) => items
                .iter()
                .map(|a| ctx.find_checker(a))
                .collect::<Result<Vec<_>, _>>()
                .map(|c| Checker::Tuple(TupleChecker::Fixed(c))),
            (Factory::Tuple, Annotation::VarTuple(elem)) => ctx
                .find_checker(elem)
                .map(|c| Checker::Tuple(TupleChecker::Variadic(c))),
            (Factory::ForwardRef, Annotation::ForwardRef(name)) => {
                Ok(Checker::ForwardRef(ForwardRefChecker::new(name.clone(), ctx)))
            }
            (Factory::Simple, Annotation::Builtin(b)) => {
                Ok(Checker::Simple(SimpleChecker::Builtin(*b)))
            }
            (Factory::Simple, Annotation::Class(def)) => {
                SimpleChecker::class(def, ctx).map(Checker::Simple)
            }
            _ => return None,
        };
        Some(built.map(Arc::new))
    }
}

fn optional(inner: &Annotation, ctx: &CreationContext) -> Result<Checker, BuildError> {
    let inner = ctx.find_checker(inner)?;
    let none = ctx.find_checker(&Annotation::None)?;
    UnionChecker::build(vec![inner, none], true, ctx).map(Checker::Union)
}

fn union(items: &[Annotation], ctx: &CreationContext) -> Result<Checker, BuildError> {
    if items.is_empty() {
        return Err(ctx.wrap(BuildError::new(BuildErrorKind::UnsupportedAnnotation(
            "Union[]".to_string(),
        ))));
    }
    let alternatives = items
        .iter()
        .map(|a| ctx.find_checker(a))
        .collect::<Result<Vec<_>, _>>()?;
    UnionChecker::build(alternatives, false, ctx).map(Checker::Union)
}

/// Compile `annotation`, consulting and filling the context's cache.
pub fn find_checker(
    annotation: &Annotation,
    ctx: &CreationContext,
) -> Result<Arc<Checker>, BuildError> {
    let key = ctx.cache.as_ref().map(|_| ctx.cache_key(annotation));
    if let (Some(cache), Some(key)) = (&ctx.cache, key) {
        if let Some(hit) = cache.get(key) {
            tracing::trace!(annotation = %annotation, "checker cache hit");
            return Ok(hit);
        }
    }

    for factory in FACTORY_ORDER {
        if let Some(built) = factory.create(annotation, ctx) {
            let checker = built?;
            tracing::debug!(
                factory = factory.name(),
                annotation = %annotation,
                checker = %checker.describe(),
                "built checker"
            );
            if let (Some(cache), Some(key)) = (&ctx.cache, key) {
                cache.insert(key, Arc::clone(&checker));
            }
            return Ok(checker);
        }
    }
    Err(ctx.wrap(BuildError::new(BuildErrorKind::UnsupportedAnnotation(
        annotation.to_string(),
    ))))
}
