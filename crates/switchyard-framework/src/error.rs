//! Framework-level errors.

use thiserror::Error;

use switchyard_core::{BoxError, DispatchError};

/// A service required by a controller factory is not in the container.
#[derive(Debug, Clone, Error)]
#[error("service not provided: {type_name}")]
pub struct ServiceMissing {
    /// Type name of the missing service.
    pub type_name: &'static str,
}

impl ServiceMissing {
    /// Creates the error for `T`.
    pub fn of<T: ?Sized>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
        }
    }
}

impl From<ServiceMissing> for DispatchError {
    fn from(err: ServiceMissing) -> Self {
        DispatchError::Abort(BoxError::from(err))
    }
}
