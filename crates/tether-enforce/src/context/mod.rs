//! Execution contexts: the blame chain.
//!
//! Every checked boundary creates one context layer. When an inner checker
//! rejects a value, the context it was given appends a frame describing the
//! violation from its own perspective and forwards the error to the layer
//! above it. Contexts are call-scoped and shared with the proxies created
//! during the call, hence `Rc`.

mod function;

use std::rc::Rc;

use tether_core::indicator::{compound, Indicated};
use tether_core::{ContractError, Frame, Location};

pub use function::{ArgumentContext, FunctionInfo, ReturnContext};

pub trait ExecutionContext {
    /// Enrich `err` with this layer's frame and hand it to the enclosing layer.
    fn wrap(&self, err: ContractError) -> ContractError;
}

pub type Ctx = Rc<dyn ExecutionContext>;

pub(crate) fn forward(upper: &Option<Ctx>, err: ContractError) -> ContractError {
    match upper {
        Some(ctx) => ctx.wrap(err),
        None => err,
    }
}

/// Outermost layer of an ad-hoc check: one frame with the declaration and
/// the site performing the check.
pub struct GenericContext {
    pub declared: Option<Location>,
    pub responsible: Option<Location>,
    pub upper: Option<Ctx>,
}

impl GenericContext {
    pub fn root(declared: Option<Location>, responsible: Option<Location>) -> Ctx {
        Rc::new(GenericContext {
            declared,
            responsible,
            upper: None,
        })
    }
}

impl ExecutionContext for GenericContext {
    fn wrap(&self, err: ContractError) -> ContractError {
        let next = err.next_type_and_indicator();
        let err = err.with_frame(Frame::new(
            next.ty,
            Some(next.indicator),
            self.declared.clone(),
            self.responsible.clone(),
        ));
        forward(&self.upper, err)
    }
}

/// `name[a, b, c]` with the member at `index` being the inner violation.
///
/// Used by unions, tuples, and container element checks. Container reads
/// set `responsible` to the reading site; container writes have no `upper`.
pub struct CompoundContext {
    pub name: String,
    pub members: Vec<String>,
    pub index: usize,
    pub declared: Option<Location>,
    pub responsible: Option<Location>,
    pub upper: Option<Ctx>,
}

impl ExecutionContext for CompoundContext {
    fn wrap(&self, err: ContractError) -> ContractError {
        let inner = err.next_type_and_indicator();
        let Indicated { ty, indicator } = compound(&self.name, &self.members, self.index, inner);
        let err = err.with_frame(Frame::new(
            ty,
            Some(indicator),
            self.declared.clone(),
            self.responsible.clone(),
        ));
        forward(&self.upper, err)
    }
}

/// The value was wrapped with an `Annotated` type; shows the annotated
/// description as context.
pub struct AnnotatedContext {
    pub description: String,
    /// A named annotated type is marked as a whole.
    pub named: bool,
    pub upper: Ctx,
}

impl ExecutionContext for AnnotatedContext {
    fn wrap(&self, err: ContractError) -> ContractError {
        let indicator = if self.named {
            "^".repeat(self.description.chars().count())
        } else {
            let offset = self.description.find('[').map(|i| i + 1).unwrap_or(0);
            format!("{}{}", " ".repeat(offset), err.next_type_and_indicator().indicator)
        };
        let err = err.with_frame(Frame::new(
            self.description.clone(),
            Some(indicator),
            None,
            None,
        ));
        self.upper.wrap(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: u32) -> Location {
        Location::at("main.py", line)
    }

    #[test]
    fn test_compound_then_generic() {
        let root = GenericContext::root(Some(loc(1)), Some(loc(9)));
        let ctx = CompoundContext {
            name: "list".into(),
            members: vec!["int".into()],
            index: 0,
            declared: Some(loc(1)),
            responsible: Some(loc(5)),
            upper: Some(root),
        };
        let err = ctx.wrap(ContractError::new(Some("'x'".into()), "int"));
        assert_eq!(err.frames.len(), 2);
        assert_eq!(err.frames[0].declared_type, "list[int]");
        assert_eq!(err.frames[1].declared_type, "list[int]");
        assert_eq!(err.blamed(), Some(&loc(5)));
        let caused: Vec<_> = err.responsible_locations();
        assert_eq!(caused, vec![&loc(5), &loc(9)]);
    }

    #[test]
    fn test_annotated_context_offsets_carets() {
        let root = GenericContext::root(None, None);
        let ctx = AnnotatedContext {
            description: "Annotated[int, x > 0]".into(),
            named: false,
            upper: root,
        };
        let err = ctx.wrap(ContractError::new(Some("'a'".into()), "int"));
        assert_eq!(err.frames[0].indicator.trim_end(), "          ^^^");
    }
}
