use std::sync::Arc;

use parking_lot::RwLock;
use tether_core::{BuildError, BuildErrorKind};

use super::Checker;
use crate::creation::CreationContext;

/// A type named by string. Resolved against the type environment on first
/// check so that mutually recursive declarations can refer to each other.
/// Resolved again whenever the environment has been redefined since.
#[derive(Debug)]
pub struct ForwardRefChecker {
    name: String,
    ctx: CreationContext,
    resolved: RwLock<Option<(u64, Arc<Checker>)>>,
}

impl ForwardRefChecker {
    pub fn new(name: impl Into<String>, ctx: &CreationContext) -> Self {
        Self {
            name: name.into(),
            ctx: ctx.clone(),
            resolved: RwLock::new(None),
        }
    }

    pub fn describe(&self) -> String {
        self.name.clone()
    }

    /// The resolved checker, if a check has already resolved it.
    pub fn resolved(&self) -> Option<Arc<Checker>> {
        self.resolved.read().as_ref().map(|(_, c)| Arc::clone(c))
    }

    pub fn resolve(&self) -> Result<Arc<Checker>, BuildError> {
        let generation = self.ctx.types.generation();
        if let Some((seen, checker)) = self.resolved.read().as_ref() {
            if *seen == generation {
                return Ok(Arc::clone(checker));
            }
        }

        let annotation = self.ctx.types.lookup(&self.name).ok_or_else(|| {
            self.ctx.wrap(BuildError::new(BuildErrorKind::UnresolvedName(
                self.name.clone(),
            )))
        })?;
        let checker = self.ctx.find_checker(&annotation)?;
        tracing::debug!(name = %self.name, generation, "resolved forward reference");
        *self.resolved.write() = Some((generation, Arc::clone(&checker)));
        Ok(checker)
    }
}
