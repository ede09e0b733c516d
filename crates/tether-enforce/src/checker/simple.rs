use std::sync::Arc;

use tether_core::BuildError;

use super::{reject, BaseType};
use crate::annotation::BuiltinType;
use crate::context::Ctx;
use crate::creation::CreationContext;
use crate::error::Error;
use crate::proxy::{DispatchKind, DispatchProxy, MethodTable};
use crate::value::{ClassDef, Value};

/// A builtin or a user class, matched nominally.
#[derive(Debug)]
pub enum SimpleChecker {
    Builtin(BuiltinType),
    Class {
        def: Arc<ClassDef>,
        /// The class's typed methods, enforced on instances of subclasses
        /// when the class is owned.
        overrides: Option<Arc<MethodTable>>,
    },
}

impl SimpleChecker {
    pub fn class(def: &Arc<ClassDef>, ctx: &CreationContext) -> Result<Self, BuildError> {
        let overrides = if ctx.is_owned(&def.module) && !def.typed_methods().is_empty() {
            Some(Arc::new(MethodTable::for_class(
                def,
                def.name.clone(),
                DispatchKind::Class,
                ctx,
            )?))
        } else {
            None
        };
        Ok(SimpleChecker::Class {
            def: Arc::clone(def),
            overrides,
        })
    }

    pub fn describe(&self) -> String {
        match self {
            SimpleChecker::Builtin(b) => b.name().to_string(),
            SimpleChecker::Class { def, .. } => def.name.clone(),
        }
    }

    pub fn base_type(&self) -> BaseType {
        match self {
            SimpleChecker::Builtin(b) => BaseType::Builtin(*b),
            SimpleChecker::Class { def, .. } => BaseType::Class(Arc::as_ptr(def) as usize),
        }
    }

    pub(crate) fn wraps_subclasses(&self) -> bool {
        matches!(self, SimpleChecker::Class { overrides: Some(_), .. })
    }

    pub fn check_and_wrap(&self, value: Value, ctx: &Ctx) -> Result<Value, Error> {
        match self {
            SimpleChecker::Builtin(b) if b.accepts(&value.unwrap_proxy()) => Ok(value),
            SimpleChecker::Builtin(b) => Err(reject(&value, b.name(), ctx)),
            SimpleChecker::Class { def, overrides } => match value.as_object() {
                Some(obj) if obj.class.is_subclass_of(def) => match overrides {
                    Some(table) if !Arc::ptr_eq(&obj.class, def) => {
                        Ok(DispatchProxy::wrap(value.unwrap_proxy(), table, ctx))
                    }
                    _ => Ok(value),
                },
                _ => Err(reject(&value, def.name.as_str(), ctx)),
            },
        }
    }
}
