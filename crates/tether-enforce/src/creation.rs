//! Build-time state for compiling annotations into checkers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tether_core::hash::hash_parts;
use tether_core::returns::ReturnSiteTable;
use tether_core::{BuildError, Location};

use crate::annotation::Annotation;
use crate::checker::Checker;
use crate::registry::{self, CheckerCache};

/// Names visible to forward references.
#[derive(Debug, Default)]
pub struct TypeEnv {
    names: RwLock<HashMap<String, Annotation>>,
    generation: AtomicU64,
}

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `name`; a later definition replaces an earlier one, and forward
    /// references already resolved to it resolve again on their next check.
    pub fn define(&self, name: impl Into<String>, annotation: Annotation) {
        self.names.write().insert(name.into(), annotation);
        self.generation.fetch_add(1, Ordering::Release);
    }

    /// Bumped by every [`define`](Self::define).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn lookup(&self, name: &str) -> Option<Annotation> {
        self.names.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.read().contains_key(name)
    }
}

/// Request-scoped state for one "compile this annotation" call.
///
/// Cloning is cheap; derived contexts (`with_typevars`, `with_declared`) share
/// the engine-wide pieces.
#[derive(Debug, Clone)]
pub struct CreationContext {
    /// Type-variable bindings, innermost last.
    pub typevars: Vec<(String, Annotation)>,
    /// Where the annotation being compiled is written.
    pub declared: Option<Location>,
    pub owned_prefixes: Arc<Vec<String>>,
    pub types: Arc<TypeEnv>,
    pub returns: Arc<ReturnSiteTable>,
    pub cache: Option<Arc<CheckerCache>>,
}

impl CreationContext {
    pub fn find_checker(&self, annotation: &Annotation) -> Result<Arc<Checker>, BuildError> {
        registry::find_checker(annotation, self)
    }

    /// Attach this context's declaration to a build error.
    pub fn wrap(&self, err: BuildError) -> BuildError {
        match &self.declared {
            Some(loc) => err.with_location(loc.clone()),
            None => err,
        }
    }

    pub fn with_typevars(&self, bindings: impl IntoIterator<Item = (String, Annotation)>) -> Self {
        let mut next = self.clone();
        next.typevars.extend(bindings);
        next
    }

    pub fn with_declared(&self, declared: Option<Location>) -> Self {
        let mut next = self.clone();
        if declared.is_some() {
            next.declared = declared;
        }
        next
    }

    /// Resolve `name` to its bound annotation and the context to compile it
    /// in, which no longer sees that binding or any later one.
    pub fn resolve_typevar(&self, name: &str) -> Option<(Annotation, CreationContext)> {
        let pos = self.typevars.iter().rposition(|(n, _)| n == name)?;
        let mut outer = self.clone();
        outer.typevars.truncate(pos);
        Some((self.typevars[pos].1.clone(), outer))
    }

    /// Whether classes from `module` get inheritance checks.
    pub fn is_owned(&self, module: &str) -> bool {
        self.owned_prefixes
            .iter()
            .any(|p| module == p || module.starts_with(&format!("{p}.")))
    }

    /// Cache key of `annotation` compiled in this context.
    pub fn cache_key(&self, annotation: &Annotation) -> u64 {
        let mut parts = vec![annotation.cache_key()];
        if let Some(loc) = &self.declared {
            parts.push(format!("{}:{}:{}", loc.file, loc.line, loc.span));
        }
        for (name, bound) in &self.typevars {
            parts.push(format!("{name}={}", bound.cache_key()));
        }
        let refs: Vec<&str> = parts.iter().map(String::as_str).collect();
        hash_parts(&refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CreationContext {
        CreationContext {
            typevars: Vec::new(),
            declared: None,
            owned_prefixes: Arc::new(vec!["shop".to_string()]),
            types: Arc::new(TypeEnv::new()),
            returns: Arc::new(ReturnSiteTable::default()),
            cache: None,
        }
    }

    #[test]
    fn test_is_owned_prefix() {
        let c = ctx();
        assert!(c.is_owned("shop"));
        assert!(c.is_owned("shop.cart"));
        assert!(!c.is_owned("shopping"));
    }

    #[test]
    fn test_resolve_typevar_hides_own_binding() {
        let c = ctx().with_typevars(vec![
            ("T".to_string(), Annotation::int()),
            ("U".to_string(), Annotation::typevar("T")),
        ]);
        let (bound, outer) = c.resolve_typevar("U").unwrap();
        assert_eq!(bound.to_string(), "T");
        assert!(outer.resolve_typevar("U").is_none());
        assert!(outer.resolve_typevar("T").is_some());
        assert!(c.resolve_typevar("V").is_none());
    }

    #[test]
    fn test_cache_key_depends_on_bindings() {
        let c = ctx();
        let bound = c.with_typevars(vec![("T".to_string(), Annotation::int())]);
        let t = Annotation::typevar("T");
        assert_ne!(c.cache_key(&t), bound.cache_key(&t));
        assert_eq!(c.cache_key(&t), ctx().cache_key(&t));
    }
}
