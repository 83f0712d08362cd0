//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use switchyard_core::DispatchError;

/// Errors that can occur while assembling an application.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A global middleware identifier has no registered implementation.
    #[error("Global middleware '{0}' is not registered")]
    UnknownMiddleware(String),

    /// Building the global pipeline failed.
    #[error("Failed to build global pipeline: {0}")]
    Pipeline(#[source] DispatchError),
}

impl From<DispatchError> for RuntimeError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::MiddlewareNotFound { name } => Self::UnknownMiddleware(name),
            other => Self::Pipeline(other),
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
