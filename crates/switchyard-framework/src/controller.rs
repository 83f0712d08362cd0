//! Controller capability traits.
//!
//! A controller exposes its actions through an explicit registry instead of
//! runtime reflection:
//!
//! - [`Controller::actions`] lists the action names it can run
//! - [`Controller::call`] runs one of them with [`Arguments`] bound by name
//! - [`DeclaresMiddleware::middleware`] lists the middleware it wants around
//!   its actions
//!
//! A controller may expose the reserved [`FALLBACK_ACTION`]. When a requested
//! action does not exist, the binder calls the fallback instead with exactly
//! two arguments: the requested action name and the full parameter bag.
//!
//! Most controllers are written with the `#[controller]` attribute from
//! `switchyard-macros`, which generates [`Controller`] for an `impl` block:
//!
//! ```rust,ignore
//! #[derive(Default)]
//! pub struct User;
//!
//! #[controller]
//! impl User {
//!     #[middleware]
//!     fn declared(&self) -> Vec<MiddlewareSpec> {
//!         vec![MiddlewareSpec::new("auth").except("show")]
//!     }
//!
//!     async fn show(&self, id: u64) -> Json<UserView> { … }
//!
//!     #[fallback]
//!     async fn missing(&self, action: String, params: Params) -> String { … }
//! }
//! ```

use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::middleware::MiddlewareSpec;
use switchyard_core::{DispatchError, DispatchResult, Params, Reply, Request};

/// Reserved action name of the catch-all fallback.
pub const FALLBACK_ACTION: &str = "__fallback";

// ============================================================================
// Arguments
// ============================================================================

/// The raw argument list handed to [`Controller::call`].
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// Arguments bound by formal parameter name.
    Named(Params),
    /// The two fallback arguments.
    Fallback {
        /// The originally requested action.
        action: String,
        /// The full original parameter bag.
        params: Params,
    },
}

impl Arguments {
    /// Binds the formal parameter `name` to a `T`.
    ///
    /// An absent parameter is treated as `null`, so `Option<T>` parameters
    /// bind to `None`; any other type reports [`DispatchError::MissingArgument`].
    pub fn bind<T: DeserializeOwned>(&self, name: &str) -> DispatchResult<T> {
        match self.params().get(name) {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| DispatchError::invalid_argument(name, e.to_string())),
            None => serde_json::from_value(Value::Null)
                .map_err(|_| DispatchError::missing_argument(name)),
        }
    }

    /// Splits fallback arguments into `(action, params)`.
    pub fn into_fallback(self) -> DispatchResult<(String, Params)> {
        match self {
            Self::Fallback { action, params } => Ok((action, params)),
            Self::Named(_) => Err(DispatchError::missing_argument("action")),
        }
    }

    /// The parameter bag, whichever the shape.
    pub fn params(&self) -> &Params {
        match self {
            Self::Named(params) | Self::Fallback { params, .. } => params,
        }
    }

    /// Returns `true` for fallback arguments.
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

// ============================================================================
// Controller traits
// ============================================================================

/// A handler type that declares middleware for its actions.
///
/// The default implementation declares none.
pub trait DeclaresMiddleware {
    /// Middleware declarations in nesting order, outermost first.
    fn middleware(&self) -> Vec<MiddlewareSpec> {
        Vec::new()
    }
}

/// A handler object whose actions can be invoked by name.
///
/// Instances are created per dispatch and never shared between requests.
pub trait Controller: DeclaresMiddleware + Send + Sync + 'static {
    /// Every action this controller can run, including [`FALLBACK_ACTION`]
    /// when it has a fallback.
    fn actions(&self) -> &'static [&'static str];

    /// Runs `action`.
    ///
    /// `action` is one of [`actions`](Self::actions); callers go through the
    /// binder, which picks the action and shapes `args`.
    fn call<'a>(
        &'a self,
        action: &'a str,
        request: &'a Request,
        args: Arguments,
    ) -> BoxFuture<'a, DispatchResult<Reply>>;

    /// Returns `true` if the controller defines a fallback action.
    fn has_fallback(&self) -> bool {
        self.actions().contains(&FALLBACK_ACTION)
    }
}
