use std::rc::Rc;
use std::sync::Arc;

use tether_core::indicator::Indicated;
use tether_core::{ContractError, Frame, Location, ViolationKind};

use crate::checker::CallableChecker;
use crate::context::{forward, Ctx, ExecutionContext, GenericContext};
use crate::error::Error;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    Argument(usize),
    Return,
}

/// Marks one position of `Callable[[A, B], R]`.
struct CallableContext {
    checker: Arc<CallableChecker>,
    position: Position,
    responsible: Option<Location>,
    upper: Option<Ctx>,
}

impl ExecutionContext for CallableContext {
    fn wrap(&self, err: ContractError) -> ContractError {
        let inner = err.next_type_and_indicator();
        let params: Vec<Indicated> = self
            .checker
            .param_names()
            .into_iter()
            .enumerate()
            .map(|(i, p)| match self.position {
                Position::Argument(idx) if idx == i => inner.clone(),
                _ => Indicated::plain(p),
            })
            .collect();
        let ret = match self.position {
            Position::Return => inner,
            Position::Argument(_) => Indicated::plain(self.checker.ret.describe()),
        };
        let shown = Indicated::plain("Callable[[")
            + Indicated::join(", ", &params)
            + Indicated::plain("], ")
            + ret
            + Indicated::plain("]");
        let err = err.with_frame(Frame::new(
            shown.ty,
            Some(shown.indicator),
            None,
            self.responsible.clone(),
        ));
        forward(&self.upper, err)
    }
}

/// A callable checked on every call: arguments blame the calling site, a bad
/// result goes to whoever supplied the callable.
pub struct CallableProxy {
    pub(crate) inner: Value,
    pub(crate) checker: Arc<CallableChecker>,
    pub(crate) ctx: Ctx,
}

impl CallableProxy {
    pub fn new(inner: Value, checker: Arc<CallableChecker>, ctx: Ctx) -> Self {
        Self {
            inner,
            checker,
            ctx,
        }
    }

    pub fn call(&self, args: &[Value], site: &Location) -> Result<Value, Error> {
        let expected = self.checker.params.len();
        if args.len() != expected {
            let err = ContractError::new(None, self.checker.describe())
                .with_kind(ViolationKind::ArgumentBinding)
                .with_header(format!(
                    "{} takes {expected} positional arguments but {} were given",
                    self.checker.describe(),
                    args.len()
                ));
            let ctx = GenericContext::root(None, Some(site.clone()));
            return Err(ctx.wrap(err).into());
        }

        let mut checked = Vec::with_capacity(args.len());
        for (i, (arg, param)) in args.iter().zip(&self.checker.params).enumerate() {
            let arg_ctx: Ctx = Rc::new(CallableContext {
                checker: Arc::clone(&self.checker),
                position: Position::Argument(i),
                responsible: Some(site.clone()),
                upper: None,
            });
            checked.push(param.check_and_wrap(arg.clone(), &arg_ctx)?);
        }

        let result = self.inner.call(&checked, site)?;
        let ret_ctx: Ctx = Rc::new(CallableContext {
            checker: Arc::clone(&self.checker),
            position: Position::Return,
            responsible: None,
            upper: Some(Rc::clone(&self.ctx)),
        });
        self.checker.ret.check_and_wrap(result, &ret_ctx)
    }
}
