use std::sync::Arc;

use tether_core::indicator::Indicated;
use tether_core::{ContractError, Frame, Location};

use super::{forward, Ctx, ExecutionContext};

/// Rendering data for a checked function's signature.
#[derive(Debug, Clone)]
pub struct FunctionInfo {
    /// Display name, e.g. `area` or `constructor Point`.
    pub name: String,
    /// `(name, type)`; unchecked parameters such as `self` have no type.
    pub params: Vec<(String, Option<String>)>,
    pub ret: String,
    pub declared: Option<Location>,
}

impl FunctionInfo {
    fn param_piece(&self, index: usize) -> String {
        match &self.params[index] {
            (name, Some(ty)) => format!("{name}: {ty}"),
            (name, None) => name.clone(),
        }
    }

    fn front(&self, marked: Option<(usize, Indicated)>) -> Indicated {
        let pieces: Vec<Indicated> = (0..self.params.len())
            .map(|i| match &marked {
                Some((idx, inner)) if *idx == i => {
                    Indicated::plain(format!("{}: ", self.params[i].0)) + inner.clone()
                }
                _ => Indicated::plain(self.param_piece(i)),
            })
            .collect();
        Indicated::plain(format!("{}(", self.name))
            + Indicated::join(", ", &pieces)
            + Indicated::plain(")")
    }

    /// `name(a: A, b: B) -> R`
    pub fn signature(&self) -> String {
        format!("{} -> {}", self.front(None).ty, self.ret)
    }

    /// The signature with `inner` in place of parameter `index`'s type.
    pub fn argument_frame(&self, index: usize, inner: Indicated) -> Indicated {
        self.front(Some((index, inner))) + Indicated::plain(format!(" -> {}", self.ret))
    }

    /// The signature with `inner` in place of the return type.
    pub fn return_frame(&self, inner: Indicated) -> Indicated {
        self.front(None) + Indicated::plain(" -> ") + inner
    }
}

/// An argument of a checked call. Blames the calling site.
pub struct ArgumentContext {
    pub info: Arc<FunctionInfo>,
    pub index: usize,
    pub responsible: Option<Location>,
    pub upper: Option<Ctx>,
}

impl ExecutionContext for ArgumentContext {
    fn wrap(&self, err: ContractError) -> ContractError {
        let shown = self
            .info
            .argument_frame(self.index, err.next_type_and_indicator());
        let err = err.with_frame(Frame::new(
            shown.ty,
            Some(shown.indicator),
            self.info.declared.clone(),
            self.responsible.clone(),
        ));
        forward(&self.upper, err)
    }
}

/// The return value of a checked call. `responsible` is the function's
/// location already narrowed to the return statement that ran.
pub struct ReturnContext {
    pub info: Arc<FunctionInfo>,
    pub declared: Option<Location>,
    pub responsible: Option<Location>,
    pub upper: Option<Ctx>,
}

impl ExecutionContext for ReturnContext {
    fn wrap(&self, err: ContractError) -> ContractError {
        let shown = self.info.return_frame(err.next_type_and_indicator());
        let err = err.with_frame(Frame::new(
            shown.ty,
            Some(shown.indicator),
            self.declared.clone(),
            self.responsible.clone(),
        ));
        forward(&self.upper, err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> Arc<FunctionInfo> {
        Arc::new(FunctionInfo {
            name: "scale".into(),
            params: vec![
                ("self".into(), None),
                ("k".into(), Some("int".into())),
            ],
            ret: "float".into(),
            declared: Some(Location::new("geo.py", 4, 6)),
        })
    }

    #[test]
    fn test_signature() {
        assert_eq!(info().signature(), "scale(self, k: int) -> float");
    }

    #[test]
    fn test_argument_frame_marks_parameter() {
        let ctx = ArgumentContext {
            info: info(),
            index: 1,
            responsible: Some(Location::at("main.py", 20)),
            upper: None,
        };
        let err = ctx.wrap(ContractError::new(Some("'a'".into()), "int"));
        let frame = &err.frames[0];
        assert_eq!(frame.declared_type, "scale(self, k: int) -> float");
        assert_eq!(frame.indicator.trim_end(), "               ^^^");
        assert_eq!(err.blamed(), Some(&Location::at("main.py", 20)));
    }

    #[test]
    fn test_return_frame_marks_return() {
        let ctx = ReturnContext {
            info: info(),
            declared: Some(Location::new("geo.py", 4, 6)),
            responsible: Some(Location::at("geo.py", 8)),
            upper: None,
        };
        let err = ctx.wrap(ContractError::new(Some("'a'".into()), "float"));
        let frame = &err.frames[0];
        assert!(frame.declared_type.ends_with("-> float"));
        assert!(frame.indicator.ends_with("^^^^^"));
        assert_eq!(err.blamed().map(|l| l.line), Some(8));
    }
}
