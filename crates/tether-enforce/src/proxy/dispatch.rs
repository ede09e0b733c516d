//! Per-method dispatch for structural interfaces and checked classes.
//!
//! A [`MethodTable`] holds one compiled signature per declared method, built
//! from the *declaring* type's annotations. A [`DispatchProxy`] routes calls
//! through it: arguments are checked against the declared types and blame the
//! caller; the result is checked against the declared return type and blames
//! the implementation, with the direction flipped to OUT.

use std::rc::Rc;
use std::sync::Arc;

use tether_core::returns::ReturnSiteTable;
use tether_core::{
    BuildError, BuildErrorKind, ContractError, Frame, Location, ResponsibilityDirection,
    ViolationKind,
};

use crate::annotation::{Annotation, InterfaceDef, MethodDecl};
use crate::checker::Checker;
use crate::context::{ArgumentContext, Ctx, ExecutionContext, FunctionInfo, GenericContext};
use crate::creation::CreationContext;
use crate::error::{Error, RuntimeError};
use crate::typed_function::TypedFunction;
use crate::value::{BoundMethod, ClassDef, FunctionRef, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    /// A structural interface.
    Interface,
    /// A class whose typed methods bind subclasses and generic instances.
    Class,
}

impl DispatchKind {
    fn word(&self) -> &'static str {
        match self {
            DispatchKind::Interface => "protocol",
            DispatchKind::Class => "parent class",
        }
    }
}

/// One declared method, compiled.
#[derive(Debug)]
pub struct CompiledMethod {
    pub name: String,
    /// `(name, checker)`; the receiver has no checker.
    pub params: Vec<(String, Option<Arc<Checker>>)>,
    pub ret: Arc<Checker>,
    pub info: Arc<FunctionInfo>,
    pub declared: Option<Location>,
}

impl CompiledMethod {
    fn from_decl(m: &MethodDecl, interface: &str, ctx: &CreationContext) -> Result<Self, BuildError> {
        let ctx = ctx.with_declared(m.declared.clone());
        let typed = m.is_typed();
        let mut params = Vec::with_capacity(m.params.len());
        for (i, p) in m.params.iter().enumerate() {
            let checker = match &p.annotation {
                _ if i == 0 && p.name == "self" => None,
                _ if !typed => Some(Checker::any()),
                Some(annotation) => Some(ctx.find_checker(annotation)?),
                None => {
                    return Err(ctx.wrap(BuildError::new(
                        BuildErrorKind::MissingInterfaceAnnotation {
                            interface: interface.to_string(),
                            method: m.name.clone(),
                            param: p.name.clone(),
                        },
                    )))
                }
            };
            params.push((p.name.clone(), checker));
        }
        let ret = match (&m.ret, typed) {
            (Some(annotation), _) => ctx.find_checker(annotation)?,
            (None, true) => ctx.find_checker(&Annotation::None)?,
            (None, false) => Checker::any(),
        };
        Ok(Self::assemble(m.name.clone(), params, ret, m.declared.clone()))
    }

    fn from_typed(f: &TypedFunction, ctx: &CreationContext) -> Result<Self, BuildError> {
        let rebound;
        let f = if ctx.typevars.is_empty() {
            f
        } else {
            rebound = f.rebind(ctx)?;
            &rebound
        };
        let params = f
            .params()
            .iter()
            .map(|p| (p.name.clone(), p.checker.clone()))
            .collect();
        Ok(Self::assemble(
            f.name().to_string(),
            params,
            Arc::clone(f.ret()),
            f.location().cloned(),
        ))
    }

    fn assemble(
        name: String,
        params: Vec<(String, Option<Arc<Checker>>)>,
        ret: Arc<Checker>,
        declared: Option<Location>,
    ) -> Self {
        let info = Arc::new(FunctionInfo {
            name: name.clone(),
            params: params
                .iter()
                .map(|(n, c)| (n.clone(), c.as_ref().map(|c| c.describe())))
                .collect(),
            ret: ret.describe(),
            declared: declared.clone(),
        });
        Self {
            name,
            params,
            ret,
            info,
            declared,
        }
    }

    fn has_receiver(&self) -> bool {
        self.params.first().map_or(false, |(_, c)| c.is_none())
    }
}

/// The compiled methods of one interface or class.
#[derive(Debug)]
pub struct MethodTable {
    /// The declaring type as shown, with type arguments.
    pub owner: String,
    /// The declaring type's bare name.
    pub owner_name: String,
    pub kind: DispatchKind,
    pub methods: Vec<Arc<CompiledMethod>>,
    pub returns: Arc<ReturnSiteTable>,
}

impl MethodTable {
    pub fn for_interface(
        def: &InterfaceDef,
        owner: String,
        ctx: &CreationContext,
    ) -> Result<Self, BuildError> {
        let methods = def
            .methods
            .iter()
            .map(|m| CompiledMethod::from_decl(m, &def.name, ctx).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            owner,
            owner_name: def.name.clone(),
            kind: DispatchKind::Interface,
            methods,
            returns: Arc::clone(&ctx.returns),
        })
    }

    pub fn for_class(
        def: &ClassDef,
        owner: String,
        kind: DispatchKind,
        ctx: &CreationContext,
    ) -> Result<Self, BuildError> {
        let methods = def
            .typed_methods()
            .iter()
            .filter(|(name, _)| name != "__init__")
            .map(|(_, f)| CompiledMethod::from_typed(f, ctx).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            owner,
            owner_name: def.name.clone(),
            kind,
            methods,
            returns: Arc::clone(&ctx.returns),
        })
    }

    pub fn find(&self, name: &str) -> Option<&Arc<CompiledMethod>> {
        self.methods.iter().find(|m| m.name == name)
    }

    fn header(&self, value: &Value) -> String {
        format!(
            "{} does not implement {} {}",
            value.type_name(),
            self.kind.word(),
            self.owner_name
        )
    }
}

fn quoted_list(names: &[&str]) -> String {
    let quoted: Vec<String> = names.iter().map(|n| format!("'{n}'")).collect();
    match quoted.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {last}", rest.join(", ")),
        _ => quoted.join(""),
    }
}

/// An instance seen through a [`MethodTable`].
pub struct DispatchProxy {
    pub(crate) inner: Value,
    pub(crate) table: Arc<MethodTable>,
    pub(crate) ctx: Ctx,
}

impl DispatchProxy {
    /// Wrap without structural verification (the value is known to be an
    /// instance of the declaring class).
    pub fn wrap(inner: Value, table: &Arc<MethodTable>, ctx: &Ctx) -> Value {
        Value::Proxy(Rc::new(super::Proxy::Object(DispatchProxy {
            inner,
            table: Arc::clone(table),
            ctx: Rc::clone(ctx),
        })))
    }

    /// Verify that `value` structurally implements the table, then wrap it.
    pub fn check_and_wrap(value: Value, table: &Arc<MethodTable>, ctx: &Ctx) -> Result<Value, Error> {
        let inner = value.unwrap_proxy();
        let class = match &inner {
            Value::Object(obj) => Some(Arc::clone(&obj.class)),
            _ => None,
        };
        let lookup = |name: &str| class.as_ref().and_then(|c| c.find_method(name).cloned());

        let missing: Vec<&str> = table
            .methods
            .iter()
            .filter(|m| lookup(&m.name).is_none())
            .map(|m| m.name.as_str())
            .collect();
        if !missing.is_empty() {
            let plural = if missing.len() == 1 { "function" } else { "functions" };
            let err = ContractError::new(Some(inner.repr()), table.owner.clone())
                .with_kind(ViolationKind::MissingMethod)
                .with_note(format!("It is missing the {plural} {}", quoted_list(&missing)));
            return Err(ctx.wrap(err).with_header(table.header(&inner)).into());
        }

        for method in &table.methods {
            let Some(implementation) = lookup(&method.name) else {
                continue;
            };
            let impl_params = implementation.param_names();
            let note = if method.params.len() > impl_params.len() {
                Some("Missing required parameters.")
            } else if method.params.first().map(|(n, _)| n.as_str()) == Some("self")
                && impl_params.first().map(String::as_str) != Some("self")
            {
                Some("Missing required parameter self.")
            } else {
                None
            };
            if let Some(note) = note {
                let err = ContractError::new(Some(inner.repr()), table.owner.clone())
                    .with_kind(ViolationKind::ArityMismatch)
                    .with_note(format!(
                        "The signature of '{}' does not match. {note}",
                        method.name
                    ));
                return Err(ctx.wrap(err).with_header(table.header(&inner)).into());
            }
        }

        Ok(Self::wrap(inner, table, ctx))
    }

    pub fn get_attr(&self, this: &Value, name: &str, site: &Location) -> Result<Value, Error> {
        if self.table.find(name).is_some() {
            return Ok(Value::Bound(Rc::new(BoundMethod {
                receiver: this.clone(),
                name: name.to_string(),
            })));
        }
        self.inner.get_attr(name, site)
    }

    pub fn call_method(&self, name: &str, args: &[Value], site: &Location) -> Result<Value, Error> {
        let Some(method) = self.table.find(name) else {
            return self.inner.call_method(name, args, site);
        };
        let implementation = self
            .inner
            .as_object()
            .and_then(|obj| obj.class.find_method(name).cloned())
            .ok_or_else(|| {
                Error::from(RuntimeError::NoAttribute {
                    type_name: self.inner.type_name(),
                    name: name.to_string(),
                })
            })?;

        let offset = usize::from(method.has_receiver());
        let expected = method.params.len() - offset;
        if args.len() != expected {
            let mut err = ContractError::new(None, method.info.signature())
                .with_kind(ViolationKind::ArgumentBinding)
                .with_header(format!(
                    "{}() takes {expected} positional arguments but {} were given",
                    method.name,
                    args.len()
                ));
            if offset == 0 {
                err = err.with_note("Hint: 'self'-parameter was omitted in declaration.");
            }
            let ctx = GenericContext::root(method.declared.clone(), Some(site.clone()));
            return Err(ctx.wrap(err).into());
        }

        let mut checked = Vec::with_capacity(args.len() + 1);
        checked.push(self.inner.clone());
        for (i, arg) in args.iter().enumerate() {
            let index = i + offset;
            match &method.params[index].1 {
                Some(checker) => {
                    let arg_ctx: Ctx = Rc::new(ArgumentContext {
                        info: Arc::clone(&method.info),
                        index,
                        responsible: Some(site.clone()),
                        upper: None,
                    });
                    checked.push(checker.check_and_wrap(arg.clone(), &arg_ctx)?);
                }
                None => checked.push(arg.clone()),
            }
        }

        let impl_location = implementation.location();
        let mark = self.table.returns.mark();
        let result = match &implementation {
            FunctionRef::Typed(f) => {
                let arg_ctx = |index: usize| -> Ctx {
                    Rc::new(ImplementationArgumentContext {
                        method: Arc::clone(method),
                        implementation: Arc::clone(f.info()),
                        index,
                        responsible: impl_location.clone(),
                        kind: self.table.kind,
                        owner_name: self.table.owner_name.clone(),
                        boundary: self.boundary(),
                    })
                };
                f.invoke(&checked, site, &arg_ctx, None)?
            }
            FunctionRef::Native(f) => (f.body)(&checked)?,
        };

        let ret_ctx: Ctx = Rc::new(ImplementationReturnContext {
            method: Arc::clone(method),
            impl_ret: implementation.as_typed().map(|f| f.ret().describe()),
            impl_declared: impl_location.clone(),
            responsible: impl_location.map(|l| self.table.returns.narrow(&l, mark)),
            kind: self.table.kind,
            owner_name: self.table.owner_name.clone(),
            boundary: self.boundary(),
        });
        method.ret.check_and_wrap(result, &ret_ctx)
    }

    fn boundary(&self) -> Boundary {
        Boundary {
            ctx: Rc::clone(&self.ctx),
            value: self.inner.clone(),
            table: Arc::clone(&self.table),
        }
    }
}

/// Where a dispatch proxy was created. Rendered as the previous chain of a
/// violation inside one of its implementations.
struct Boundary {
    ctx: Ctx,
    value: Value,
    table: Arc<MethodTable>,
}

impl Boundary {
    fn chain(&self) -> ContractError {
        let err = ContractError::new(Some(self.value.repr()), self.table.owner.clone())
            .with_header(self.table.header(&self.value));
        self.ctx.wrap(err)
    }
}

/// An argument rejected by a checked implementation after the declared
/// signature accepted it: the implementation's annotation is narrower.
struct ImplementationArgumentContext {
    method: Arc<CompiledMethod>,
    implementation: Arc<FunctionInfo>,
    index: usize,
    responsible: Option<Location>,
    kind: DispatchKind,
    owner_name: String,
    boundary: Boundary,
}

impl ExecutionContext for ImplementationArgumentContext {
    fn wrap(&self, err: ContractError) -> ContractError {
        let impl_expected = err.next_type_and_indicator().ty;
        let shown = self
            .implementation
            .argument_frame(self.index, err.next_type_and_indicator());
        let err = err.with_frame(Frame::new(
            shown.ty,
            Some(shown.indicator),
            self.implementation.declared.clone(),
            None,
        ));
        let next = err.next_type_and_indicator();
        let mut err = err.with_frame(Frame::new(
            next.ty,
            Some(next.indicator),
            self.method.declared.clone(),
            self.responsible.clone(),
        ));
        if let Some((param, Some(declared))) = self.method.params.get(self.index) {
            let word = self.kind.word();
            err = err
                .with_note(format!(
                    "Argument {param} of method {} violates the type declared by the {word} {}.",
                    self.method.name, self.owner_name
                ))
                .with_note(format!(
                    "Annotation {impl_expected} is incompatible with the {word}'s annotation {}.",
                    declared.describe()
                ));
        }
        err.with_previous_chain(self.boundary.chain())
    }
}

/// The result of an implementation checked against the declared return type.
/// The implementation is responsible, so the direction flips to OUT.
struct ImplementationReturnContext {
    method: Arc<CompiledMethod>,
    /// The implementation's own return annotation, if it is checked.
    impl_ret: Option<String>,
    impl_declared: Option<Location>,
    responsible: Option<Location>,
    kind: DispatchKind,
    owner_name: String,
    boundary: Boundary,
}

impl ExecutionContext for ImplementationReturnContext {
    fn wrap(&self, err: ContractError) -> ContractError {
        let shown = self.method.info.return_frame(err.next_type_and_indicator());
        let err = err.with_frame(Frame::new(
            shown.ty,
            Some(shown.indicator),
            self.impl_declared.clone(),
            None,
        ));
        // Already attributed to an inner implementation.
        if err.direction == ResponsibilityDirection::Out {
            return err;
        }
        let next = err.next_type_and_indicator();
        let mut err = err.with_inverted_direction().with_frame(Frame::new(
            next.ty,
            Some(next.indicator),
            self.method.declared.clone(),
            self.responsible.clone(),
        ));
        if let Some(impl_ret) = &self.impl_ret {
            let word = self.kind.word();
            err = err
                .with_note(format!(
                    "The return value of method '{}' does violate the {word} '{}'.",
                    self.method.name, self.owner_name
                ))
                .with_note(format!(
                    "The annotation '{impl_ret}' is incompatible with the {word}'s annotation '{}'\nwhen checking against the following value:",
                    self.method.ret.describe()
                ));
        }
        err.with_previous_chain(self.boundary.chain())
    }
}
