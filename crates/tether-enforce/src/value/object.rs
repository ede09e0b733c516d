use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use tether_core::Location;

use crate::annotation::Annotation;
use crate::checker::Checker;
use crate::typed_function::TypedFunction;
use crate::value::{FunctionRef, Value};

/// A typed field of a class, with its compiled checker.
#[derive(Debug)]
pub struct FieldDef {
    pub name: String,
    pub annotation: Annotation,
    pub checker: Arc<Checker>,
    pub declared: Option<Location>,
}

/// A user class. Built by [`Engine::define_class`](crate::Engine::define_class).
#[derive(Debug)]
pub struct ClassDef {
    pub name: String,
    pub module: String,
    pub bases: Vec<Arc<ClassDef>>,
    pub type_params: Vec<String>,
    pub methods: Vec<(String, FunctionRef)>,
    pub fields: Vec<FieldDef>,
    pub declared: Option<Location>,
}

impl ClassDef {
    pub fn qualified_name(&self) -> String {
        if self.module.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.module, self.name)
        }
    }

    /// Method lookup along the base chain, own methods first.
    pub fn find_method(&self, name: &str) -> Option<&FunctionRef> {
        self.methods
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, f)| f)
            .or_else(|| self.bases.iter().find_map(|b| b.find_method(name)))
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .or_else(|| self.bases.iter().find_map(|b| b.find_field(name)))
    }

    pub fn is_subclass_of(&self, other: &ClassDef) -> bool {
        std::ptr::eq(self, other) || self.bases.iter().any(|b| b.is_subclass_of(other))
    }

    /// Checked methods visible on this class, nearest definition winning.
    pub fn typed_methods(&self) -> Vec<(String, Arc<TypedFunction>)> {
        let mut out: Vec<(String, Arc<TypedFunction>)> = Vec::new();
        self.collect_typed(&mut out);
        out
    }

    fn collect_typed(&self, out: &mut Vec<(String, Arc<TypedFunction>)>) {
        for (name, f) in &self.methods {
            if out.iter().any(|(n, _)| n == name) {
                continue;
            }
            if let FunctionRef::Typed(tf) = f {
                out.push((name.clone(), Arc::clone(tf)));
            }
        }
        for base in &self.bases {
            base.collect_typed(out);
        }
    }

    /// Create an instance and run `__init__` (if any) with `args`.
    /// The constructor's own return value is discarded.
    pub fn instantiate(
        class: &Arc<ClassDef>,
        args: &[Value],
        site: &Location,
    ) -> Result<Value, crate::Error> {
        let obj = Value::Object(Rc::new(Object::new(Arc::clone(class))));
        if let Some(init) = class.find_method("__init__") {
            let mut full = Vec::with_capacity(args.len() + 1);
            full.push(obj.clone());
            full.extend_from_slice(args);
            init.call(&full, site)?;
        }
        Ok(obj)
    }
}

/// A field before compilation.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub annotation: Annotation,
    pub declared: Option<Location>,
}

/// Description of a class for [`Engine::define_class`](crate::Engine::define_class).
#[derive(Debug, Clone)]
pub struct ClassSpec {
    pub name: String,
    pub module: String,
    pub bases: Vec<Arc<ClassDef>>,
    pub type_params: Vec<String>,
    pub methods: Vec<(String, FunctionRef)>,
    pub fields: Vec<FieldSpec>,
    pub declared: Option<Location>,
}

impl ClassSpec {
    pub fn new(name: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            module: module.into(),
            bases: Vec::new(),
            type_params: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            declared: None,
        }
    }

    pub fn base(mut self, base: &Arc<ClassDef>) -> Self {
        self.bases.push(Arc::clone(base));
        self
    }

    pub fn type_param(mut self, name: impl Into<String>) -> Self {
        self.type_params.push(name.into());
        self
    }

    pub fn method(mut self, name: impl Into<String>, function: FunctionRef) -> Self {
        self.methods.push((name.into(), function));
        self
    }

    pub fn field(mut self, name: impl Into<String>, annotation: Annotation) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            annotation,
            declared: None,
        });
        self
    }

    pub fn field_at(
        mut self,
        name: impl Into<String>,
        annotation: Annotation,
        declared: Location,
    ) -> Self {
        self.fields.push(FieldSpec {
            name: name.into(),
            annotation,
            declared: Some(declared),
        });
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.declared = Some(location);
        self
    }
}

/// An instance of a [`ClassDef`].
#[derive(Debug)]
pub struct Object {
    pub class: Arc<ClassDef>,
    attrs: RefCell<BTreeMap<String, Value>>,
}

impl Object {
    pub fn new(class: Arc<ClassDef>) -> Self {
        Self {
            class,
            attrs: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn attr(&self, name: &str) -> Option<Value> {
        self.attrs.borrow().get(name).cloned()
    }

    /// Store without any check.
    pub fn store(&self, name: &str, value: Value) {
        self.attrs.borrow_mut().insert(name.to_string(), value);
    }

    pub fn repr(&self) -> String {
        let attrs: Vec<String> = self
            .attrs
            .borrow()
            .iter()
            .map(|(k, v)| format!("{k}={}", v.repr()))
            .collect();
        format!("{}({})", self.class.name, attrs.join(", "))
    }
}

/// `receiver.name` looked up as a method, called later.
#[derive(Debug)]
pub struct BoundMethod {
    pub receiver: Value,
    pub name: String,
}
