//! Checked functions: the boundary installer's output.
//!
//! A [`FunctionSpec`] describes a host function with its annotations; it is
//! compiled once into a [`TypedFunction`] whose [`call`](TypedFunction::call)
//! binds arguments, checks them, runs preconditions, invokes the body, checks
//! the result against the return annotation, and finally runs
//! postconditions.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tether_core::returns::ReturnSiteTable;
use tether_core::{BuildError, BuildErrorKind, ContractError, Frame, Location, ViolationKind};

use crate::annotation::{Annotation, LiteralValue};
use crate::checker::Checker;
use crate::condition::{Condition, ConditionSpec};
use crate::context::{ArgumentContext, Ctx, ExecutionContext, FunctionInfo, GenericContext, ReturnContext};
use crate::creation::CreationContext;
use crate::error::Error;
use crate::value::{NativeFn, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    Function,
    Method,
    Constructor,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub annotation: Option<Annotation>,
    pub default: Option<LiteralValue>,
}

/// A function to be checked, as supplied by the instrumentation layer.
#[derive(Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub kind: FunctionKind,
    pub declaring_class: Option<String>,
    pub params: Vec<ParamSpec>,
    pub ret: Option<Annotation>,
    pub location: Option<Location>,
    pub requires: Vec<ConditionSpec>,
    pub ensures: Vec<ConditionSpec>,
    pub body: NativeFn,
}

impl FunctionSpec {
    pub fn new(
        name: impl Into<String>,
        body: impl Fn(&[Value]) -> Result<Value, Error> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            kind: FunctionKind::Function,
            declaring_class: None,
            params: Vec::new(),
            ret: None,
            location: None,
            requires: Vec::new(),
            ensures: Vec::new(),
            body: Arc::new(body),
        }
    }

    fn with_receiver(mut self, kind: FunctionKind, class: impl Into<String>) -> Self {
        self.kind = kind;
        self.declaring_class = Some(class.into());
        self.params.insert(
            0,
            ParamSpec {
                name: "self".to_string(),
                annotation: None,
                default: None,
            },
        );
        self
    }

    /// A method of `class`; `self` is prepended and never checked.
    pub fn method(self, class: impl Into<String>) -> Self {
        self.with_receiver(FunctionKind::Method, class)
    }

    /// The constructor of `class`. Its return value is ignored.
    pub fn constructor(self, class: impl Into<String>) -> Self {
        self.with_receiver(FunctionKind::Constructor, class)
    }

    pub fn param(mut self, name: impl Into<String>, annotation: Annotation) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            annotation: Some(annotation),
            default: None,
        });
        self
    }

    pub fn param_with_default(
        mut self,
        name: impl Into<String>,
        annotation: Annotation,
        default: impl Into<LiteralValue>,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            annotation: Some(annotation),
            default: Some(default.into()),
        });
        self
    }

    pub fn untyped_param(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            annotation: None,
            default: None,
        });
        self
    }

    pub fn returns(mut self, annotation: Annotation) -> Self {
        self.ret = Some(annotation);
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    pub fn requires(mut self, condition: ConditionSpec) -> Self {
        self.requires.push(condition);
        self
    }

    pub fn ensures(mut self, condition: ConditionSpec) -> Self {
        self.ensures.push(condition);
        self
    }

    fn display_name(&self) -> String {
        match &self.declaring_class {
            Some(class) if self.kind == FunctionKind::Constructor => format!("constructor {class}"),
            _ => self.name.clone(),
        }
    }
}

impl fmt::Debug for FunctionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("declaring_class", &self.declaring_class)
            .field("params", &self.params)
            .field("ret", &self.ret)
            .field("location", &self.location)
            .finish()
    }
}

/// A parameter with its compiled checker. The receiver has none.
#[derive(Debug, Clone)]
pub struct CompiledParam {
    pub name: String,
    pub checker: Option<Arc<Checker>>,
    pub default: Option<LiteralValue>,
}

pub struct TypedFunction {
    spec: FunctionSpec,
    params: Vec<CompiledParam>,
    ret: Arc<Checker>,
    info: Arc<FunctionInfo>,
    requires: Vec<Condition>,
    ensures: Vec<Condition>,
    returns: Arc<ReturnSiteTable>,
}

impl TypedFunction {
    pub fn compile(spec: FunctionSpec, ctx: &CreationContext) -> Result<Self, BuildError> {
        let ctx = ctx.with_declared(spec.location.clone());
        let receiver = spec.kind != FunctionKind::Function;

        let mut params = Vec::with_capacity(spec.params.len());
        for (i, p) in spec.params.iter().enumerate() {
            let checker = match &p.annotation {
                Some(annotation) => Some(ctx.find_checker(annotation)?),
                None if receiver && i == 0 && (p.name == "self" || p.name == "cls") => None,
                None => {
                    return Err(ctx.wrap(BuildError::new(BuildErrorKind::MissingAnnotation {
                        function: spec.name.clone(),
                        param: p.name.clone(),
                    })))
                }
            };
            params.push(CompiledParam {
                name: p.name.clone(),
                checker,
                default: p.default.clone(),
            });
        }

        let ret = match (&spec.ret, spec.kind) {
            (_, FunctionKind::Constructor) => Checker::any(),
            (Some(annotation), _) => ctx.find_checker(annotation)?,
            (None, _) => ctx.find_checker(&Annotation::None)?,
        };

        let names: Vec<String> = params.iter().map(|p| p.name.clone()).collect();
        let requires = spec
            .requires
            .iter()
            .map(|c| Condition::compile(c, &spec.name, &names, false))
            .collect::<Result<Vec<_>, _>>()?;
        let ensures = spec
            .ensures
            .iter()
            .map(|c| Condition::compile(c, &spec.name, &names, true))
            .collect::<Result<Vec<_>, _>>()?;

        let info = Arc::new(FunctionInfo {
            name: spec.display_name(),
            params: params
                .iter()
                .map(|p| (p.name.clone(), p.checker.as_ref().map(|c| c.describe())))
                .collect(),
            ret: ret.describe(),
            declared: spec.location.clone(),
        });
        tracing::debug!(function = %info.signature(), "compiled checked function");

        Ok(Self {
            spec,
            params,
            ret,
            info,
            requires,
            ensures,
            returns: Arc::clone(&ctx.returns),
        })
    }

    /// Recompile under additional type-variable bindings.
    pub fn rebind(&self, ctx: &CreationContext) -> Result<TypedFunction, BuildError> {
        TypedFunction::compile(self.spec.clone(), ctx)
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn param_names(&self) -> Vec<String> {
        self.params.iter().map(|p| p.name.clone()).collect()
    }

    pub fn location(&self) -> Option<&Location> {
        self.spec.location.as_ref()
    }

    pub fn kind(&self) -> FunctionKind {
        self.spec.kind
    }

    pub fn spec(&self) -> &FunctionSpec {
        &self.spec
    }

    pub fn params(&self) -> &[CompiledParam] {
        &self.params
    }

    pub fn ret(&self) -> &Arc<Checker> {
        &self.ret
    }

    pub fn info(&self) -> &Arc<FunctionInfo> {
        &self.info
    }

    /// Call with every argument (`self` included) from `site`.
    pub fn call(&self, args: &[Value], site: &Location) -> Result<Value, Error> {
        let arg_ctx = |index: usize| -> Ctx {
            Rc::new(ArgumentContext {
                info: Arc::clone(&self.info),
                index,
                responsible: Some(site.clone()),
                upper: None,
            })
        };
        self.invoke(args, site, &arg_ctx, None)
    }

    /// Like [`call`](Self::call), with the argument contexts and the layer
    /// above the return context supplied by the caller. Used when the call
    /// goes through an interface or a parent class.
    pub fn invoke(
        &self,
        args: &[Value],
        site: &Location,
        arg_ctx: &dyn Fn(usize) -> Ctx,
        ret_upper: Option<Ctx>,
    ) -> Result<Value, Error> {
        let mut bound = self.bind(args, site)?;
        for (i, param) in self.params.iter().enumerate() {
            if let Some(checker) = &param.checker {
                let value = std::mem::replace(&mut bound[i], Value::None);
                bound[i] = checker.check_and_wrap(value, &arg_ctx(i))?;
            }
        }

        for cond in &self.requires {
            if !cond.holds(&bound, None) {
                let err = ContractError::new(
                    Some(cond.bindings(&bound, None)),
                    format!("passing: {}", cond.source()),
                )
                .with_kind(ViolationKind::ConditionFailed)
                .with_note("Failed precondition.")
                .with_frame(Frame::new(
                    self.info.signature(),
                    Some(String::new()),
                    cond.location().cloned(),
                    None,
                ));
                let ctx = GenericContext::root(self.spec.location.clone(), Some(site.clone()));
                return Err(ctx.wrap(err).into());
            }
        }

        let mark = self.returns.mark();
        let result = (self.spec.body)(&bound)?;
        if self.spec.kind == FunctionKind::Constructor {
            return Ok(Value::None);
        }

        let responsible = self
            .spec
            .location
            .as_ref()
            .map(|loc| self.returns.narrow(loc, mark));
        let ret_ctx: Ctx = Rc::new(ReturnContext {
            info: Arc::clone(&self.info),
            declared: self.spec.location.clone(),
            responsible,
            upper: ret_upper,
        });
        let result = self.ret.check_and_wrap(result, &ret_ctx)?;

        for cond in &self.ensures {
            if !cond.holds(&bound, Some(&result)) {
                let err = ContractError::new(
                    Some(cond.bindings(&bound, Some(&result))),
                    format!("passing: {}", cond.source()),
                )
                .with_kind(ViolationKind::ConditionFailed)
                .with_note("Failed postcondition")
                .with_frame(Frame::new(
                    self.ret.describe(),
                    Some(String::new()),
                    cond.location().cloned(),
                    None,
                ));
                return Err(ret_ctx.wrap(err).into());
            }
        }
        Ok(result)
    }

    /// Match positional arguments to parameters, filling defaults.
    fn bind(&self, args: &[Value], site: &Location) -> Result<Vec<Value>, Error> {
        let binding_error = |header: String| -> Error {
            let err = ContractError::new(None, self.info.signature())
                .with_kind(ViolationKind::ArgumentBinding)
                .with_header(header);
            GenericContext::root(self.spec.location.clone(), Some(site.clone()))
                .wrap(err)
                .into()
        };

        if args.len() > self.params.len() {
            return Err(binding_error(format!(
                "{}() takes {} positional arguments but {} were given",
                self.spec.name,
                self.params.len(),
                args.len()
            )));
        }
        let mut bound = args.to_vec();
        for param in &self.params[args.len()..] {
            match &param.default {
                Some(default) => bound.push(default.to_value()),
                None => {
                    return Err(binding_error(format!(
                        "{}() missing a required argument: '{}'",
                        self.spec.name, param.name
                    )))
                }
            }
        }
        Ok(bound)
    }
}

impl fmt::Debug for TypedFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedFunction")
            .field("signature", &self.info.signature())
            .field("location", &self.spec.location)
            .finish()
    }
}
