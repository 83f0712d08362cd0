//! Dispatch targets.
//!
//! The route matcher hands over a [`RouteMatch`]: either an invocable
//! callback, a `(controller, action)` pair, or a raw path. Resolution turns it
//! into exactly one [`DispatchTarget`], applying the configured defaults and
//! naming rules and recording the controller/action pair on the [`Request`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::trace;

use crate::config::DispatchConfig;
use crate::error::{DispatchResult, RoutingError};
use crate::naming;
use crate::reply::{IntoReply, Reply};
use crate::request::{Params, Request};

// ============================================================================
// Callback
// ============================================================================

/// An invocable route target.
///
/// Implemented for every `Fn(Params) -> impl Future<Output = impl IntoReply>`.
pub trait Callback: Send + Sync + 'static {
    /// Invokes the callback with the final parameter bag.
    fn call(&self, params: Params) -> BoxFuture<'static, DispatchResult<Reply>>;
}

impl<F, Fut, R> Callback for F
where
    F: Fn(Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply,
{
    fn call(&self, params: Params) -> BoxFuture<'static, DispatchResult<Reply>> {
        let fut = (self)(params);
        Box::pin(async move { fut.await.into_reply() })
    }
}

/// A shared, type-erased callback.
pub type BoxedCallback = Arc<dyn Callback>;

// ============================================================================
// RouteMatch
// ============================================================================

/// What the route matcher resolved a request to.
#[derive(Clone)]
pub enum RouteTarget {
    /// An invocable reference.
    Callback(BoxedCallback),
    /// A structured `(controller, action)` pair; either part may be absent.
    Controller {
        controller: Option<String>,
        action: Option<String>,
    },
    /// A raw path such as `"user/edit"`.
    Path(String),
}

impl std::fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callback(_) => f.write_str("Callback(..)"),
            Self::Controller { controller, action } => f
                .debug_struct("Controller")
                .field("controller", controller)
                .field("action", action)
                .finish(),
            Self::Path(path) => f.debug_tuple("Path").field(path).finish(),
        }
    }
}

/// Route matcher output: the target plus named path parameters and any
/// dispatch-specific extra parameters.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The matched target.
    pub target: RouteTarget,
    /// Named path parameters.
    pub params: Params,
    /// Extra parameters supplied with the target; they override the request
    /// bag on key collision.
    pub extra: Params,
}

impl RouteMatch {
    /// Creates a match for an arbitrary target.
    pub fn new(target: RouteTarget) -> Self {
        Self {
            target,
            params: Params::new(),
            extra: Params::new(),
        }
    }

    /// Matches a callback.
    pub fn callback<C: Callback>(callback: C) -> Self {
        Self::new(RouteTarget::Callback(Arc::new(callback)))
    }

    /// Matches a `(controller, action)` pair.
    pub fn controller(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self::new(RouteTarget::Controller {
            controller: Some(controller.into()),
            action: Some(action.into()),
        })
    }

    /// Matches a raw path.
    pub fn path(path: impl Into<String>) -> Self {
        Self::new(RouteTarget::Path(path.into()))
    }

    /// Adds a named path parameter (builder pattern).
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Adds a dispatch-specific extra parameter (builder pattern).
    pub fn with_extra(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

// ============================================================================
// ReservedRoutes
// ============================================================================

/// `controller/action` paths owned by explicit route definitions.
///
/// URL-derived dispatch must not reach them through the implicit
/// `controller/action` convention.
#[derive(Debug, Clone, Default)]
pub struct ReservedRoutes {
    paths: HashSet<String>,
}

impl ReservedRoutes {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a `controller/action` path (case-insensitive).
    pub fn reserve(&mut self, path: &str) {
        self.paths.insert(path.trim_matches('/').to_lowercase());
    }

    /// Returns `true` if the resolved pair is reserved.
    pub fn contains(&self, controller: &str, action: &str) -> bool {
        !self.paths.is_empty()
            && self
                .paths
                .contains(&format!("{controller}/{action}").to_lowercase())
    }

    /// Number of reserved paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Returns `true` if nothing is reserved.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

// ============================================================================
// DispatchTarget
// ============================================================================

/// A resolved controller/action pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerAction {
    /// Normalised controller name (e.g. `admin.User`).
    pub controller: String,
    /// Action name.
    pub action: String,
    /// Dispatch-specific parameters, merged over the request bag.
    pub param: Params,
}

impl ControllerAction {
    /// Applies defaults and naming rules, then records the pair on `request`.
    pub fn resolve(
        controller: Option<&str>,
        action: Option<&str>,
        param: Params,
        config: &DispatchConfig,
        request: &mut Request,
    ) -> Self {
        let controller = match controller.filter(|c| !c.is_empty()) {
            Some(name) => naming::controller_name(name),
            None => config.default_controller.clone(),
        };
        let action = match action.filter(|a| !a.is_empty()) {
            Some(name) => name.to_string(),
            None => config.default_action.clone(),
        };

        request.set_controller(controller.clone());
        request.set_action(action.clone());

        Self {
            controller,
            action,
            param,
        }
    }
}

/// The resolved, ready-to-execute representation of a matched route.
#[derive(Clone)]
pub enum DispatchTarget {
    /// Invoke a callback with the merged parameter bag.
    Callback {
        callback: BoxedCallback,
        extra: Params,
    },
    /// Run a controller action named by the route.
    Controller(ControllerAction),
    /// Run a controller action derived from a raw path.
    UrlDerived(ControllerAction),
}

impl DispatchTarget {
    /// Resolves a route-matcher result into a dispatch target.
    pub fn resolve(
        route: RouteMatch,
        request: &mut Request,
        config: &DispatchConfig,
        reserved: &ReservedRoutes,
    ) -> DispatchResult<Self> {
        request.merge_route_params(route.params);

        match route.target {
            RouteTarget::Callback(callback) => Ok(Self::Callback {
                callback,
                extra: route.extra,
            }),
            RouteTarget::Controller { controller, action } => {
                Ok(Self::Controller(ControllerAction::resolve(
                    controller.as_deref(),
                    action.as_deref(),
                    route.extra,
                    config,
                    request,
                )))
            }
            RouteTarget::Path(path) => {
                let (controller, action) = parse_path(&path)?;
                let target = ControllerAction::resolve(
                    controller,
                    action,
                    route.extra,
                    config,
                    request,
                );
                if reserved.contains(&target.controller, &target.action) {
                    return Err(RoutingError::ConflictingRoute {
                        path: format!("{}/{}", target.controller, target.action),
                    }
                    .into());
                }
                Ok(Self::UrlDerived(target))
            }
        }
    }

    /// The controller/action pair, if this is a controller target.
    pub fn controller_action(&self) -> Option<&ControllerAction> {
        match self {
            Self::Callback { .. } => None,
            Self::Controller(target) | Self::UrlDerived(target) => Some(target),
        }
    }
}

impl std::fmt::Debug for DispatchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Callback { extra, .. } => f
                .debug_struct("Callback")
                .field("extra", extra)
                .finish_non_exhaustive(),
            Self::Controller(target) => f.debug_tuple("Controller").field(target).finish(),
            Self::UrlDerived(target) => f.debug_tuple("UrlDerived").field(target).finish(),
        }
    }
}

/// Splits a raw path into controller and action candidates.
///
/// Segments after the second are left to the route matcher.
fn parse_path(path: &str) -> DispatchResult<(Option<&str>, Option<&str>)> {
    let mut segments = path.trim_matches('/').split('/');
    let controller = segments.next().filter(|s| !s.is_empty());
    let action = segments.next().filter(|s| !s.is_empty());

    if let Some(candidate) = controller {
        if !naming::is_valid_controller(candidate) {
            return Err(RoutingError::NotFound {
                path: path.to_string(),
            }
            .into());
        }
    }

    trace!(path, ?controller, ?action, "parsed URL dispatch path");
    Ok((controller, action))
}
