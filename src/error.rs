//! Error kinds shared across the core.

use thiserror::Error;

/// The result type returned by fallible public constructors in the core.
pub type Result<T> = std::result::Result<T, RenderError>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("allocation failure: {0}")]
    AllocationFailure(String),

    #[error("i/o failure: {0}")]
    Io(String),
}

impl RenderError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        RenderError::InvalidArgument(msg.into())
    }

    pub fn alloc(msg: impl Into<String>) -> Self {
        RenderError::AllocationFailure(msg.into())
    }
}

impl From<std::io::Error> for RenderError {
    fn from(e: std::io::Error) -> Self {
        RenderError::Io(e.to_string())
    }
}
