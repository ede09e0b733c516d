use std::rc::Rc;
use std::sync::Arc;

use tether_core::BuildError;

use super::{reject, Checker};
use crate::annotation::Annotation;
use crate::context::Ctx;
use crate::creation::CreationContext;
use crate::error::Error;
use crate::proxy::{CallableProxy, Proxy};
use crate::value::Value;

/// `Callable[[A, B], R]`.
#[derive(Debug)]
pub struct CallableChecker {
    pub params: Vec<Arc<Checker>>,
    pub ret: Arc<Checker>,
}

impl CallableChecker {
    pub fn build(
        params: &[Annotation],
        ret: &Annotation,
        ctx: &CreationContext,
    ) -> Result<Self, BuildError> {
        let params = params
            .iter()
            .map(|p| ctx.find_checker(p))
            .collect::<Result<Vec<_>, _>>()?;
        let ret = ctx.find_checker(ret)?;
        Ok(Self { params, ret })
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.describe()).collect()
    }

    pub fn describe(&self) -> String {
        format!(
            "Callable[[{}], {}]",
            self.param_names().join(", "),
            self.ret.describe()
        )
    }

    fn is_callable(value: &Value) -> bool {
        match value {
            Value::Function(_) | Value::Bound(_) => true,
            Value::Object(obj) => obj.class.find_method("__call__").is_some(),
            _ => false,
        }
    }

    pub fn check_and_wrap(this: &Arc<Self>, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        let inner = value.unwrap_proxy();
        if !Self::is_callable(&inner) {
            return Err(reject(&value, this.describe(), ctx));
        }
        let proxy = CallableProxy::new(inner, Arc::clone(this), Rc::clone(ctx));
        Ok(Value::Proxy(Rc::new(Proxy::Callable(proxy))))
    }
}
