//! Error types for the Switchyard dispatch layer.
//!
//! Every failure that can occur between "a route was matched" and "the handler
//! produced a reply" is expressed as a [`DispatchError`]. The caller (the
//! transport-facing orchestrator) decides how to render it; nothing in this
//! layer logs, retries or suppresses an error.

use thiserror::Error;

/// A boxed, thread-safe error used for collaborator-defined failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Routing Errors
// =============================================================================

/// Errors raised while turning a matched route into a dispatch target.
#[derive(Debug, Clone, Error)]
pub enum RoutingError {
    /// The raw path does not name a valid controller.
    #[error("route not found: {path}")]
    NotFound {
        /// The offending path.
        path: String,
    },

    /// The URL-derived controller/action pair is owned by an explicit route.
    #[error("route '{path}' is reserved by an explicit route definition")]
    ConflictingRoute {
        /// The normalised `controller/action` path.
        path: String,
    },
}

// =============================================================================
// Dispatch Errors
// =============================================================================

/// Errors that can occur while resolving and running a handler.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Route-level failure (404-equivalent).
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// Neither the requested controller class nor the empty controller exist.
    #[error("controller class not exists: {requested}")]
    ClassNotFound {
        /// The originally requested, fully-qualified class name.
        requested: String,
    },

    /// The action does not exist and the controller has no fallback action.
    #[error("method not exists: {class}->{method}()")]
    MethodNotFound {
        /// Class of the resolved controller.
        class: String,
        /// Requested action.
        method: String,
    },

    /// A required action argument is absent from the parameter bag.
    #[error("missing argument '{name}'")]
    MissingArgument {
        /// Formal parameter name.
        name: String,
    },

    /// An action argument is present but cannot be converted.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument {
        /// Formal parameter name.
        name: String,
        /// Conversion failure.
        reason: String,
    },

    /// A declared middleware identifier has no registered implementation.
    #[error("middleware '{name}' is not registered")]
    MiddlewareNotFound {
        /// The unknown identifier.
        name: String,
    },

    /// A controller factory failed. Renders as the factory's own error.
    #[error("{source}")]
    Construction {
        /// Class being constructed.
        class: String,
        /// The factory's own error, untouched.
        #[source]
        source: BoxError,
    },

    /// A handler return value could not be serialised.
    #[error("failed to serialize reply: {0}")]
    Serialize(#[from] serde_json::Error),

    /// A collaborator-defined failure raised inside the pipeline.
    #[error("{0}")]
    Abort(BoxError),
}

impl DispatchError {
    /// Wraps an arbitrary middleware or handler failure.
    pub fn abort(err: impl Into<BoxError>) -> Self {
        Self::Abort(err.into())
    }

    /// Creates a [`DispatchError::MethodNotFound`].
    pub fn method_not_found(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Creates a [`DispatchError::MissingArgument`].
    pub fn missing_argument(name: impl Into<String>) -> Self {
        Self::MissingArgument { name: name.into() }
    }

    /// Creates a [`DispatchError::InvalidArgument`].
    pub fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for the failures a transport should render as "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Routing(_) | Self::ClassNotFound { .. } | Self::MethodNotFound { .. }
        )
    }

    /// HTTP-equivalent status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            _ if self.is_not_found() => 404,
            Self::MissingArgument { .. } | Self::InvalidArgument { .. } => 400,
            _ => 500,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
