use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use tether_core::{BuildError, BuildErrorKind};

use super::{reject, Checker};
use crate::context::{CompoundContext, Ctx};
use crate::creation::CreationContext;
use crate::error::Error;
use crate::value::Value;

/// `Union[...]` and `Optional[T]`.
///
/// Alternatives are tried highest priority first, so structural shapes only
/// see values no concrete alternative accepted.
#[derive(Debug)]
pub struct UnionChecker {
    alternatives: Vec<Arc<Checker>>,
    /// `Optional[T]`: exactly `[T, None]`, shown as `Optional[T]`.
    optional: bool,
}

impl UnionChecker {
    pub fn build(
        mut alternatives: Vec<Arc<Checker>>,
        optional: bool,
        ctx: &CreationContext,
    ) -> Result<Self, BuildError> {
        alternatives.sort_by_key(|c| -c.priority());
        let union = Self {
            alternatives,
            optional,
        };

        let mut seen: HashMap<_, String> = HashMap::new();
        for alt in &union.alternatives {
            for base in alt.base_types() {
                if let Some(first) = seen.get(&base) {
                    return Err(ctx.wrap(BuildError::new(BuildErrorKind::AmbiguousUnion {
                        first: alt.describe(),
                        second: first.clone(),
                        union: union.describe(),
                    })));
                }
                seen.insert(base, alt.describe());
            }
        }
        Ok(union)
    }

    pub fn alternatives(&self) -> &[Arc<Checker>] {
        &self.alternatives
    }

    fn shown(&self) -> Vec<&Arc<Checker>> {
        self.alternatives
            .iter()
            .filter(|a| !(self.optional && matches!(***a, Checker::None)))
            .collect()
    }

    fn members(&self) -> Vec<String> {
        self.shown().iter().map(|a| a.describe()).collect()
    }

    fn name(&self) -> &'static str {
        if self.optional {
            "Optional"
        } else {
            "Union"
        }
    }

    pub fn describe(&self) -> String {
        format!("{}[{}]", self.name(), self.members().join(", "))
    }

    pub fn check_and_wrap(&self, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        let members = self.members();
        let shown = self.shown();
        for alt in &self.alternatives {
            let index = shown.iter().position(|s| Arc::ptr_eq(s, alt)).unwrap_or(0);
            let alt_ctx: Ctx = Rc::new(CompoundContext {
                name: self.name().to_string(),
                members: members.clone(),
                index,
                declared: None,
                responsible: None,
                upper: Some(Rc::clone(ctx)),
            });
            match alt.check_and_wrap(value.clone(), &alt_ctx) {
                Ok(accepted) => return Ok(accepted),
                // A rejection only means this alternative does not apply.
                Err(Error::Contract(_)) => continue,
                Err(other) => return Err(other),
            }
        }
        Err(reject(&value, self.describe(), ctx))
    }
}
