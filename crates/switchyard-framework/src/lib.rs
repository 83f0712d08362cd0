//! # Switchyard Framework
//!
//! Everything between a resolved [`DispatchTarget`] and a [`Reply`]:
//!
//! - [`resolver`]: class naming, controller registry and per-dispatch
//!   instance construction
//! - [`middleware`]: declarations, discovery and the middleware registry
//! - [`pipeline`]: the onion executor shared by every scope
//! - [`binder`]: action selection, fallback and argument binding
//! - [`dispatcher`]: the orchestrator tying these together
//!
//! Controllers are usually written with `#[controller]` from
//! `switchyard-macros`; the generated code goes through [`__private`].
//!
//! [`DispatchTarget`]: switchyard_core::DispatchTarget
//! [`Reply`]: switchyard_core::Reply

pub mod binder;
pub mod container;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod middleware;
pub mod pipeline;
pub mod resolver;

pub use binder::{MethodTarget, invoke, select_method};
pub use container::Services;
pub use controller::{Arguments, Controller, DeclaresMiddleware, FALLBACK_ACTION};
pub use dispatcher::{DispatchRequest, Dispatcher, DispatcherBuilder};
pub use error::ServiceMissing;
pub use middleware::{
    ActionSet, Middleware, MiddlewareFn, MiddlewareRegistry, MiddlewareSpec, discover,
    middleware_fn,
};
pub use pipeline::{CONTROLLER_SCOPE, GLOBAL_SCOPE, Next, Pipeline, Stage};
pub use resolver::{ControllerFactory, ControllerRegistry, ControllerResolver, ResolvedHandler};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        Controller, DeclaresMiddleware, Dispatcher, Middleware, MiddlewareSpec, Next, Services,
        middleware_fn,
    };
    pub use async_trait::async_trait;
    pub use switchyard_core::prelude::*;
}

/// Items used by code generated by `#[controller]`.
#[doc(hidden)]
pub mod __private {
    pub use crate::controller::{Arguments, Controller, DeclaresMiddleware, FALLBACK_ACTION};
    pub use crate::middleware::MiddlewareSpec;
    pub use futures::future::BoxFuture;
    pub use switchyard_core::{DispatchError, DispatchResult, IntoReply, Params, Reply, Request};
}
