use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Which side of a boundary is responsible for a value.
///
/// `In` blames whoever supplied the value to the boundary (a caller passing an
/// argument). `Out` blames the side producing it (an implementation returning
/// through an interface).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponsibilityDirection {
    In,
    Out,
}

impl ResponsibilityDirection {
    pub fn invert(self) -> Self {
        match self {
            ResponsibilityDirection::In => ResponsibilityDirection::Out,
            ResponsibilityDirection::Out => ResponsibilityDirection::In,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponsibilityDirection::In => "in",
            ResponsibilityDirection::Out => "out",
        }
    }
}

impl std::fmt::Display for ResponsibilityDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One layer of diagnostic context attached to a propagating violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub declared_type: String,
    /// Carets under the part of `declared_type` that is implicated.
    pub indicator: String,
    pub declared: Option<Location>,
    pub responsible: Option<Location>,
    /// Stamped by [`ContractError::with_frame`](crate::ContractError::with_frame).
    pub direction: Option<ResponsibilityDirection>,
}

impl Frame {
    /// A frame; without an explicit indicator the whole type is marked.
    pub fn new(
        declared_type: impl Into<String>,
        indicator: Option<String>,
        declared: Option<Location>,
        responsible: Option<Location>,
    ) -> Self {
        let declared_type = declared_type.into();
        let indicator = indicator.unwrap_or_else(|| "^".repeat(declared_type.chars().count()));
        Self {
            declared_type,
            indicator,
            declared,
            responsible,
            direction: None,
        }
    }
}
