use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tether_core::{BuildError, BuildErrorKind, ContractError};

use super::Checker;
use crate::annotation::{members_repr, Annotation, LiteralValue, Metadata, Predicate};
use crate::context::{AnnotatedContext, Ctx};
use crate::creation::CreationContext;
use crate::error::Error;
use crate::value::Value;

struct Condition {
    check: Predicate,
    source: Option<String>,
}

/// `Annotated[T, ...]`: the inner type plus predicates and membership tests.
pub struct AnnotatedChecker {
    inner: Arc<Checker>,
    conditions: Vec<Condition>,
    members: Vec<Vec<LiteralValue>>,
    info: Vec<String>,
    /// Set when exactly one info string was given.
    name: Option<String>,
    description: String,
}

impl AnnotatedChecker {
    pub fn build(
        inner: &Annotation,
        metadata: &[Metadata],
        ctx: &CreationContext,
    ) -> Result<Self, BuildError> {
        if metadata.is_empty() {
            return Err(ctx.wrap(BuildError::new(BuildErrorKind::UnsupportedMetadata(
                format!("Annotated[{inner}] without metadata"),
            ))));
        }
        let inner_checker = ctx.find_checker(inner)?;
        let mut conditions = Vec::new();
        let mut members = Vec::new();
        let mut info = Vec::new();
        for m in metadata {
            match m {
                Metadata::Predicate { check, source } => conditions.push(Condition {
                    check: Arc::clone(check),
                    source: source.clone(),
                }),
                Metadata::Member(values) => members.push(values.clone()),
                Metadata::Info(text) => info.push(text.clone()),
            }
        }
        let name = match info.as_slice() {
            [single] => Some(single.clone()),
            _ => None,
        };
        let description = match &name {
            Some(n) => n.clone(),
            None => {
                let meta: Vec<String> = metadata.iter().map(Metadata::describe).collect();
                format!("Annotated[{}, {}]", inner_checker.describe(), meta.join(", "))
            }
        };
        Ok(Self {
            inner: inner_checker,
            conditions,
            members,
            info,
            name,
            description,
        })
    }

    pub fn inner(&self) -> &Arc<Checker> {
        &self.inner
    }

    pub fn describe(&self) -> String {
        self.description.clone()
    }

    fn violation(&self, value: &Value) -> ContractError {
        ContractError::new(Some(value.repr()), self.description.clone())
    }

    fn with_info(&self, mut err: ContractError) -> ContractError {
        for text in &self.info {
            err = err.with_note(format!("    - {text}"));
        }
        err
    }

    pub fn check_and_wrap(&self, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        let inner_ctx: Ctx = Rc::new(AnnotatedContext {
            description: self.description.clone(),
            named: self.name.is_some(),
            upper: Rc::clone(ctx),
        });
        let value = self.inner.check_and_wrap(value, &inner_ctx)?;

        for cond in &self.conditions {
            if !(cond.check)(&value) {
                let mut err = self.violation(&value);
                if self.name.is_none() {
                    let shown = cond.source.as_deref().unwrap_or("<predicate>");
                    err = err.with_note(format!("condition in {shown} does not hold"));
                }
                return Err(ctx.wrap(self.with_info(err)).into());
            }
        }
        for container in &self.members {
            if !container.iter().any(|m| m.matches(&value)) {
                let err = self
                    .violation(&value)
                    .with_note(format!("{} is not in {}.", value.repr(), members_repr(container)));
                return Err(ctx.wrap(self.with_info(err)).into());
            }
        }
        Ok(value)
    }
}

impl fmt::Debug for AnnotatedChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotatedChecker")
            .field("inner", &self.inner)
            .field("description", &self.description)
            .finish()
    }
}
