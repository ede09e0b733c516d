use std::sync::Arc;

use tether_core::{BuildError, BuildErrorKind};

use super::{reject, BaseType};
use crate::annotation::{Annotation, InterfaceDef};
use crate::context::Ctx;
use crate::creation::CreationContext;
use crate::error::Error;
use crate::proxy::{DispatchKind, DispatchProxy, MethodTable};
use crate::value::{ClassDef, Value};

fn type_args(
    name: &str,
    params: &[String],
    args: &[Annotation],
    ctx: &CreationContext,
) -> Result<(String, Vec<(String, Annotation)>), BuildError> {
    if args.is_empty() {
        return Ok((name.to_string(), Vec::new()));
    }
    if args.len() != params.len() {
        return Err(ctx.wrap(BuildError::new(BuildErrorKind::TypeArgumentCount {
            name: name.to_string(),
            expected: params.len(),
            given: args.len(),
        })));
    }
    let shown: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    let bindings = params.iter().cloned().zip(args.iter().cloned()).collect();
    Ok((format!("{name}[{}]", shown.join(", ")), bindings))
}

/// A structural interface. Accepts any value whose type defines every
/// declared method with a compatible arity, and wraps it so each call is
/// checked against the interface's own signatures.
#[derive(Debug)]
pub struct InterfaceChecker {
    pub def: Arc<InterfaceDef>,
    table: Arc<MethodTable>,
}

impl InterfaceChecker {
    pub fn build(
        def: &Arc<InterfaceDef>,
        args: &[Annotation],
        ctx: &CreationContext,
    ) -> Result<Self, BuildError> {
        let (described, bindings) = type_args(&def.name, &def.type_params, args, ctx)?;
        let ctx = ctx.with_typevars(bindings);
        let table = MethodTable::for_interface(def, described, &ctx)?;
        Ok(Self {
            def: Arc::clone(def),
            table: Arc::new(table),
        })
    }

    pub fn describe(&self) -> String {
        self.table.owner.clone()
    }

    pub fn check_and_wrap(&self, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        DispatchProxy::check_and_wrap(value, &self.table, ctx)
    }
}

/// A user class with bound type parameters, e.g. `Box[int]`.
#[derive(Debug)]
pub struct GenericChecker {
    pub class: Arc<ClassDef>,
    table: Arc<MethodTable>,
}

impl GenericChecker {
    pub fn build(
        class: &Arc<ClassDef>,
        args: &[Annotation],
        ctx: &CreationContext,
    ) -> Result<Self, BuildError> {
        if args.len() != class.type_params.len() {
            return Err(ctx.wrap(BuildError::new(BuildErrorKind::TypeArgumentCount {
                name: class.name.clone(),
                expected: class.type_params.len(),
                given: args.len(),
            })));
        }
        let (described, bindings) = type_args(&class.name, &class.type_params, args, ctx)?;
        let ctx = ctx.with_typevars(bindings);
        let table = MethodTable::for_class(class, described, DispatchKind::Class, &ctx)?;
        Ok(Self {
            class: Arc::clone(class),
            table: Arc::new(table),
        })
    }

    pub fn describe(&self) -> String {
        self.table.owner.clone()
    }

    pub fn base_type(&self) -> BaseType {
        BaseType::Class(Arc::as_ptr(&self.class) as usize)
    }

    pub fn check_and_wrap(&self, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        match value.as_object() {
            Some(obj) if obj.class.is_subclass_of(&self.class) => {
                Ok(DispatchProxy::wrap(value.unwrap_proxy(), &self.table, ctx))
            }
            _ => Err(reject(&value, self.describe(), ctx)),
        }
    }
}
