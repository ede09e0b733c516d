use std::rc::Rc;
use std::sync::Arc;

use tether_core::{BuildError, BuildErrorKind, ContractError, Location, ViolationKind};

use super::{BaseType, Checker};
use crate::annotation::{Annotation, ContainerKind};
use crate::context::{CompoundContext, Ctx};
use crate::creation::CreationContext;
use crate::error::Error;
use crate::proxy::{IterableProxy, MappingProxy, Proxy, SequenceProxy, SetProxy};
use crate::value::Value;

/// A parametric container: `list[T]`, `dict[K, V]`, `set[T]`,
/// `Sequence[T]`, `Iterable[T]`, `Iterator[T]`.
///
/// Accepted values come back as proxies that check elements lazily.
#[derive(Debug)]
pub struct ContainerChecker {
    pub kind: ContainerKind,
    /// One checker per type argument; `Any` for an unparameterized container.
    pub args: Vec<Arc<Checker>>,
    pub declared: Option<Location>,
    bare: bool,
}

impl ContainerChecker {
    pub fn build(
        kind: ContainerKind,
        args: &[Annotation],
        ctx: &CreationContext,
    ) -> Result<Self, BuildError> {
        if args.is_empty() {
            return Ok(Self {
                kind,
                args: (0..kind.arity()).map(|_| Checker::any()).collect(),
                declared: ctx.declared.clone(),
                bare: true,
            });
        }
        if args.len() != kind.arity() {
            return Err(ctx.wrap(BuildError::new(BuildErrorKind::TypeArgumentCount {
                name: kind.name().to_string(),
                expected: kind.arity(),
                given: args.len(),
            })));
        }
        let args = args
            .iter()
            .map(|a| ctx.find_checker(a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            kind,
            args,
            declared: ctx.declared.clone(),
            bare: false,
        })
    }

    pub fn is_bare(&self) -> bool {
        self.bare || self.args.iter().all(|a| matches!(**a, Checker::Any(_)))
    }

    fn members(&self) -> Vec<String> {
        self.args.iter().map(|a| a.describe()).collect()
    }

    pub fn describe(&self) -> String {
        if self.bare {
            self.kind.name().to_string()
        } else {
            format!("{}[{}]", self.kind.name(), self.members().join(", "))
        }
    }

    pub fn base_type(&self) -> BaseType {
        if self.kind.is_abstract() {
            BaseType::Interface
        } else {
            BaseType::Container(self.kind)
        }
    }

    fn element_ctx(&self, index: usize, site: &Location, upper: Option<Ctx>) -> Ctx {
        Rc::new(CompoundContext {
            name: self.kind.name().to_string(),
            members: self.members(),
            index,
            declared: self.declared.clone(),
            responsible: Some(site.clone()),
            upper,
        })
    }

    /// Check an element extracted at `site` from a container wrapped under
    /// `upper`. The reader is blamed first, then the wrapping boundary.
    pub(crate) fn read(
        &self,
        index: usize,
        value: Value,
        site: &Location,
        upper: &Ctx,
    ) -> Result<Value, Error> {
        let ctx = self.element_ctx(index, site, Some(Rc::clone(upper)));
        self.args[index].check_and_wrap(value, &ctx)
    }

    /// Check an element about to be inserted at `site`. Only the writer is
    /// blamed.
    pub(crate) fn write(&self, index: usize, value: Value, site: &Location) -> Result<(), Error> {
        let ctx = self.element_ctx(index, site, None);
        self.args[index].check_and_wrap(value, &ctx).map(|_| ())
    }

    fn accepts_shape(&self, value: &Value) -> bool {
        match self.kind {
            ContainerKind::List => matches!(value, Value::List(_)),
            ContainerKind::Dict => matches!(value, Value::Dict(_)),
            ContainerKind::Set => matches!(value, Value::Set(_)),
            ContainerKind::Sequence => {
                matches!(value, Value::List(_) | Value::Tuple(_) | Value::Str(_))
            }
            ContainerKind::Iterable => matches!(
                value,
                Value::List(_)
                    | Value::Tuple(_)
                    | Value::Str(_)
                    | Value::Dict(_)
                    | Value::Set(_)
                    | Value::Iterator(_)
            ),
            ContainerKind::Iterator => matches!(value, Value::Iterator(_)),
        }
    }

    pub fn check_and_wrap(this: &Arc<Self>, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        // Re-wrapping starts from the original, never from another proxy.
        let inner = value.unwrap_proxy();
        if !this.accepts_shape(&inner) {
            let err = ContractError::new(Some(value.repr()), this.describe())
                .with_kind(ViolationKind::NotAContainer);
            return Err(ctx.wrap(err).into());
        }
        if this.is_bare() {
            return Ok(inner);
        }
        let checker = Arc::clone(this);
        let ctx = Rc::clone(ctx);
        let proxy = match this.kind {
            ContainerKind::List | ContainerKind::Sequence => {
                Proxy::Sequence(SequenceProxy::new(inner, checker, ctx))
            }
            ContainerKind::Dict => Proxy::Mapping(MappingProxy::new(inner, checker, ctx)),
            ContainerKind::Set => Proxy::Set(SetProxy::new(inner, checker, ctx)),
            ContainerKind::Iterable | ContainerKind::Iterator => {
                Proxy::Iterable(IterableProxy::new(inner, checker, ctx))
            }
        };
        Ok(Value::Proxy(Rc::new(proxy)))
    }
}
