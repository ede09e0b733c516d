use std::path::Path;
use std::sync::Arc;

use tether_core::config::TetherConfig;
use tether_core::returns::{ReturnSiteId, ReturnSiteTable};
use tether_core::{BuildError, Location};

use crate::annotation::{Annotation, InterfaceDef};
use crate::checker::Checker;
use crate::context::GenericContext;
use crate::creation::{CreationContext, TypeEnv};
use crate::error::Error;
use crate::registry::CheckerCache;
use crate::typed_function::{FunctionSpec, TypedFunction};
use crate::value::{ClassDef, ClassSpec, FieldDef, Value};

/// Entry point of the checker. Owns the process-wide pieces: configuration,
/// the checker cache, the return-site table and the names visible to
/// forward references.
pub struct Engine {
    config: TetherConfig,
    cache: Arc<CheckerCache>,
    returns: Arc<ReturnSiteTable>,
    types: Arc<TypeEnv>,
    owned: Arc<Vec<String>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self::with_config(TetherConfig::default())
    }

    /// Create an engine configured from a `TetherConfig`.
    pub fn with_config(config: TetherConfig) -> Self {
        let returns = Arc::new(ReturnSiteTable::new(config.returns.lookback));
        let owned = Arc::new(config.checked_prefixes.clone());
        Self {
            config,
            cache: Arc::new(CheckerCache::new()),
            returns,
            types: Arc::new(TypeEnv::new()),
            owned,
        }
    }

    /// Create an engine from `<root>/.tether/tether.json`, falling back to
    /// defaults.
    pub fn load(root: &Path) -> Self {
        Self::with_config(TetherConfig::load(&root.join(".tether")))
    }

    pub fn config(&self) -> &TetherConfig {
        &self.config
    }

    pub fn returns(&self) -> &Arc<ReturnSiteTable> {
        &self.returns
    }

    pub fn types(&self) -> &Arc<TypeEnv> {
        &self.types
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn creation_context(&self, declared: Option<Location>) -> CreationContext {
        CreationContext {
            typevars: Vec::new(),
            declared,
            owned_prefixes: Arc::clone(&self.owned),
            types: Arc::clone(&self.types),
            returns: Arc::clone(&self.returns),
            cache: self
                .config
                .cache
                .enabled
                .then(|| Arc::clone(&self.cache)),
        }
    }

    /// Compile `annotation` into a checker. Build errors surface here, not on
    /// first use, except for unresolved forward references.
    pub fn compile(&self, annotation: &Annotation) -> Result<Arc<Checker>, BuildError> {
        self.creation_context(None).find_checker(annotation)
    }

    /// Ad-hoc check of `value` against `annotation` declared at `declared`,
    /// performed by `site`. Returns the value, possibly wrapped.
    pub fn check(
        &self,
        annotation: &Annotation,
        value: Value,
        declared: Option<Location>,
        site: &Location,
    ) -> Result<Value, Error> {
        let checker = self.creation_context(declared.clone()).find_checker(annotation)?;
        let ctx = GenericContext::root(declared, Some(site.clone()));
        checker.check_and_wrap(value, &ctx)
    }

    /// Install a checked function.
    pub fn install(&self, spec: FunctionSpec) -> Result<Arc<TypedFunction>, BuildError> {
        let ctx = self.creation_context(spec.location.clone());
        Ok(Arc::new(TypedFunction::compile(spec, &ctx)?))
    }

    /// Compile a class's typed fields and make it visible by name.
    pub fn define_class(&self, spec: ClassSpec) -> Result<Arc<ClassDef>, BuildError> {
        let ctx = self.creation_context(spec.declared.clone());
        let mut fields = Vec::with_capacity(spec.fields.len());
        for field in spec.fields {
            let checker = ctx
                .with_declared(field.declared.clone())
                .find_checker(&field.annotation)?;
            fields.push(FieldDef {
                name: field.name,
                annotation: field.annotation,
                checker,
                declared: field.declared.or_else(|| spec.declared.clone()),
            });
        }
        let def = Arc::new(ClassDef {
            name: spec.name,
            module: spec.module,
            bases: spec.bases,
            type_params: spec.type_params,
            methods: spec.methods,
            fields,
            declared: spec.declared,
        });
        tracing::debug!(class = %def.qualified_name(), "defined class");
        self.types.define(def.name.clone(), Annotation::class(&def));
        Ok(def)
    }

    /// Make an interface visible by name.
    pub fn define_interface(&self, def: InterfaceDef) -> Arc<InterfaceDef> {
        let def = Arc::new(def);
        self.types.define(def.name.clone(), Annotation::interface(&def));
        def
    }

    /// Bind `name` for forward references.
    pub fn define_name(&self, name: impl Into<String>, annotation: Annotation) {
        self.types.define(name, annotation);
    }

    /// Assign an id to the return statement at `(file, line)`.
    pub fn register_return(&self, file: &str, line: u32) -> ReturnSiteId {
        self.returns.register(file, line)
    }

    /// Called by instrumented code right before return statement `id` runs.
    pub fn record_return(&self, id: ReturnSiteId) {
        self.returns.record(id);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
