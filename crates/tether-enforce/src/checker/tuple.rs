use std::rc::Rc;
use std::sync::Arc;

use tether_core::ContractError;

use super::{reject, Checker};
use crate::context::{CompoundContext, Ctx};
use crate::error::Error;
use crate::value::Value;

/// `tuple[A, B]` or `tuple[T, ...]`. Tuples are immutable, so elements are
/// checked eagerly; a new tuple is built only if some element got wrapped.
#[derive(Debug)]
pub enum TupleChecker {
    Fixed(Vec<Arc<Checker>>),
    Variadic(Arc<Checker>),
}

impl TupleChecker {
    pub fn elements(&self) -> Vec<&Arc<Checker>> {
        match self {
            TupleChecker::Fixed(items) => items.iter().collect(),
            TupleChecker::Variadic(elem) => vec![elem],
        }
    }

    fn members(&self) -> Vec<String> {
        match self {
            TupleChecker::Fixed(items) => items.iter().map(|c| c.describe()).collect(),
            TupleChecker::Variadic(elem) => vec![elem.describe(), "...".to_string()],
        }
    }

    pub fn describe(&self) -> String {
        format!("tuple[{}]", self.members().join(", "))
    }

    pub fn check_and_wrap(&self, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        let items = match value.unwrap_proxy() {
            Value::Tuple(items) => items,
            _ => return Err(reject(&value, self.describe(), ctx)),
        };
        if let TupleChecker::Fixed(expected) = self {
            if expected.len() != items.len() {
                let err = ContractError::new(Some(value.repr()), self.describe()).with_note(
                    format!(
                        "expected a tuple of length {}, got length {}",
                        expected.len(),
                        items.len()
                    ),
                );
                return Err(ctx.wrap(err).into());
            }
        }

        let members = self.members();
        let mut checked = Vec::with_capacity(items.len());
        let mut changed = false;
        for (i, item) in items.iter().enumerate() {
            let (checker, index) = match self {
                TupleChecker::Fixed(expected) => (&expected[i], i),
                TupleChecker::Variadic(elem) => (elem, 0),
            };
            let elem_ctx: Ctx = Rc::new(CompoundContext {
                name: "tuple".to_string(),
                members: members.clone(),
                index,
                declared: None,
                responsible: None,
                upper: Some(Rc::clone(ctx)),
            });
            let out = checker.check_and_wrap(item.clone(), &elem_ctx)?;
            changed |= out.is_proxy();
            checked.push(out);
        }
        if changed {
            Ok(Value::tuple(checked))
        } else {
            Ok(value)
        }
    }
}
