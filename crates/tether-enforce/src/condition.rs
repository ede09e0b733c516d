//! Pre- and postconditions of checked functions.

use std::fmt;
use std::sync::Arc;

use tether_core::{BuildError, BuildErrorKind, Location};

use crate::value::Value;

pub type ConditionFn = Arc<dyn Fn(&[Value]) -> bool + Send + Sync>;

/// A condition as written: the parameters it reads, in order, and its source
/// text for messages. Postconditions may read `ret`.
#[derive(Clone)]
pub struct ConditionSpec {
    pub params: Vec<String>,
    pub source: String,
    pub location: Option<Location>,
    pub check: ConditionFn,
}

impl ConditionSpec {
    pub fn new(
        params: &[&str],
        source: impl Into<String>,
        check: impl Fn(&[Value]) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            params: params.iter().map(|p| p.to_string()).collect(),
            source: source.into(),
            location: None,
            check: Arc::new(check),
        }
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }
}

impl fmt::Debug for ConditionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionSpec")
            .field("params", &self.params)
            .field("source", &self.source)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Param(usize),
    Ret,
}

/// A condition with its parameters resolved to argument positions.
#[derive(Debug, Clone)]
pub struct Condition {
    spec: ConditionSpec,
    slots: Vec<Slot>,
}

impl Condition {
    /// Resolve `spec` against `params`. `ret` is only allowed for
    /// postconditions.
    pub fn compile(
        spec: &ConditionSpec,
        function: &str,
        params: &[String],
        allow_ret: bool,
    ) -> Result<Self, BuildError> {
        let mut slots = Vec::with_capacity(spec.params.len());
        for name in &spec.params {
            let slot = match params.iter().position(|p| p == name) {
                Some(i) => Slot::Param(i),
                None if allow_ret && name == "ret" => Slot::Ret,
                None => {
                    let err = BuildError::new(BuildErrorKind::ConditionParameter {
                        function: function.to_string(),
                        param: name.clone(),
                    });
                    return Err(match &spec.location {
                        Some(loc) => err.with_location(loc.clone()),
                        None => err,
                    });
                }
            };
            slots.push(slot);
        }
        Ok(Self {
            spec: spec.clone(),
            slots,
        })
    }

    pub fn source(&self) -> &str {
        &self.spec.source
    }

    pub fn location(&self) -> Option<&Location> {
        self.spec.location.as_ref()
    }

    fn arguments(&self, args: &[Value], ret: Option<&Value>) -> Vec<Value> {
        self.slots
            .iter()
            .map(|slot| match slot {
                Slot::Param(i) => args.get(*i).cloned().unwrap_or(Value::None),
                Slot::Ret => ret.cloned().unwrap_or(Value::None),
            })
            .collect()
    }

    pub fn holds(&self, args: &[Value], ret: Option<&Value>) -> bool {
        (self.spec.check)(&self.arguments(args, ret))
    }

    /// `a=1, b='x'` for the `given:` line.
    pub fn bindings(&self, args: &[Value], ret: Option<&Value>) -> String {
        self.spec
            .params
            .iter()
            .zip(self.arguments(args, ret))
            .map(|(name, value)| format!("{name}={}", value.repr()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_unknown_parameter_is_build_error() {
        let spec = ConditionSpec::new(&["c"], "c > 0", |_| true).at(Location::at("m.py", 2));
        let err = Condition::compile(&spec, "div", &params(), false).unwrap_err();
        assert!(matches!(err.kind, BuildErrorKind::ConditionParameter { .. }));
        assert_eq!(err.locations, vec![Location::at("m.py", 2)]);
    }

    #[test]
    fn test_ret_only_in_postconditions() {
        let spec = ConditionSpec::new(&["ret"], "ret >= 0", |v| v[0].as_int() >= Some(0));
        assert!(Condition::compile(&spec, "f", &params(), false).is_err());
        let post = Condition::compile(&spec, "f", &params(), true).unwrap();
        assert!(post.holds(&[], Some(&Value::Int(3))));
        assert!(!post.holds(&[], Some(&Value::Int(-3))));
    }

    #[test]
    fn test_bindings_follow_condition_order() {
        let spec = ConditionSpec::new(&["b", "a"], "b != a", |v| !v[0].equals(&v[1]));
        let cond = Condition::compile(&spec, "f", &params(), false).unwrap();
        let args = [Value::Int(1), Value::str("x")];
        assert_eq!(cond.bindings(&args, None), "b='x', a=1");
        assert!(cond.holds(&args, None));
    }
}
