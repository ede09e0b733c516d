use tether_core::{BuildError, ContractError};

/// Failure of any checked operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("{0}")]
    Contract(Box<ContractError>),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<ContractError> for Error {
    fn from(err: ContractError) -> Self {
        Error::Contract(Box::new(err))
    }
}

impl Error {
    pub fn as_contract(&self) -> Option<&ContractError> {
        match self {
            Error::Contract(err) => Some(err),
            _ => None,
        }
    }

    pub fn into_contract(self) -> Option<ContractError> {
        match self {
            Error::Contract(err) => Some(*err),
            _ => None,
        }
    }

    pub fn as_build(&self) -> Option<&BuildError> {
        match self {
            Error::Build(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_contract(&self) -> bool {
        matches!(self, Error::Contract(_))
    }
}

/// Errors raised by host-value operations themselves, not by contracts.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuntimeError {
    #[error("{type_name} index out of range: {index}")]
    IndexOutOfRange { type_name: String, index: i64 },

    #[error("key not found: {0}")]
    KeyNotFound(String),

    #[error("'{type_name}' object has no attribute '{name}'")]
    NoAttribute { type_name: String, name: String },

    #[error("unsupported operation '{op}' for {type_name}")]
    Unsupported { op: String, type_name: String },

    #[error("'{0}' object is not callable")]
    NotCallable(String),

    #[error("{0}")]
    Empty(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("integer overflow in {0}")]
    Overflow(String),

    #[error("{0}")]
    Raised(String),
}

impl RuntimeError {
    pub fn unsupported(op: &str, type_name: &str) -> Self {
        RuntimeError::Unsupported {
            op: op.to_string(),
            type_name: type_name.to_string(),
        }
    }
}
