//! Middleware: declaration, discovery and registration.
//!
//! - [`spec`] – [`MiddlewareSpec`], the structured declaration a controller
//!   makes through [`DeclaresMiddleware`](crate::DeclaresMiddleware)
//! - [`discover`] – expands a controller's declarations into the ordered list
//!   that applies to the current action
//! - [`registry`] – maps identifiers to [`Middleware`] implementations
//!
//! A middleware receives the request and a [`Next`] continuation. It may call
//! `next.run(request)` and post-process the reply, return a reply without
//! calling `next` (short-circuit), or fail, which aborts the whole chain.
//!
//! ```rust,ignore
//! struct Auth;
//!
//! #[async_trait]
//! impl Middleware for Auth {
//!     async fn handle(&self, request: Request, next: Next, _params: &[Value]) -> DispatchResult<Reply> {
//!         if request.param("token").is_none() {
//!             return Ok(Reply::text("unauthorized").with_status(401));
//!         }
//!         next.run(request).await
//!     }
//! }
//! ```

pub mod discover;
pub mod registry;
pub mod spec;

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::pipeline::Next;
use switchyard_core::{DispatchResult, Reply, Request};

pub use discover::discover;
pub use registry::MiddlewareRegistry;
pub use spec::{ActionSet, MiddlewareSpec};

/// An interceptor stage wrapped around the final handler.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Handles `request`, delegating to `next` to continue the chain.
    ///
    /// `params` are the declaration's static and extra parameters.
    async fn handle(&self, request: Request, next: Next, params: &[Value])
    -> DispatchResult<Reply>;
}

/// Adapts an async closure into a [`Middleware`].
///
/// Produced by [`middleware_fn`].
#[derive(Clone)]
pub struct MiddlewareFn<F> {
    f: F,
}

/// Creates a middleware from an async closure.
///
/// ```rust,ignore
/// registry.register("timing", middleware_fn(|request, next, _params| async move {
///     let started = Instant::now();
///     let reply = next.run(request).await?;
///     Ok(reply.with_header("x-elapsed-ms", started.elapsed().as_millis().to_string()))
/// }));
/// ```
pub fn middleware_fn<F, Fut>(f: F) -> MiddlewareFn<F>
where
    F: Fn(Request, Next, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Reply>> + Send + 'static,
{
    MiddlewareFn { f }
}

#[async_trait]
impl<F, Fut> Middleware for MiddlewareFn<F>
where
    F: Fn(Request, Next, Vec<Value>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DispatchResult<Reply>> + Send + 'static,
{
    async fn handle(
        &self,
        request: Request,
        next: Next,
        params: &[Value],
    ) -> DispatchResult<Reply> {
        (self.f)(request, next, params.to_vec()).await
    }
}
