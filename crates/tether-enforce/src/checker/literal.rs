use tether_core::{BuildError, BuildErrorKind};

use super::reject;
use crate::annotation::LiteralValue;
use crate::context::Ctx;
use crate::creation::CreationContext;
use crate::error::Error;
use crate::value::Value;

/// `Literal[v1, v2, ...]`: the value must equal one of the listed values.
#[derive(Debug)]
pub struct LiteralChecker {
    values: Vec<LiteralValue>,
}

impl LiteralChecker {
    pub fn build(values: &[LiteralValue], ctx: &CreationContext) -> Result<Self, BuildError> {
        if values.is_empty() {
            return Err(ctx.wrap(BuildError::new(BuildErrorKind::UnsupportedAnnotation(
                "Literal[]".to_string(),
            ))));
        }
        Ok(Self {
            values: values.to_vec(),
        })
    }

    pub fn describe(&self) -> String {
        let items: Vec<String> = self.values.iter().map(LiteralValue::repr).collect();
        format!("Literal[{}]", items.join(", "))
    }

    pub fn check_and_wrap(&self, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        if self.values.iter().any(|v| v.matches(&value)) {
            Ok(value)
        } else {
            Err(reject(&value, self.describe(), ctx))
        }
    }
}
