//! The dispatcher.
//!
//! [`Dispatcher`] takes a route-matcher result and a request and produces a
//! reply:
//!
//! 1. the [`RouteMatch`] is resolved into a [`DispatchTarget`]
//! 2. a callback target is invoked directly with the merged parameter bag
//! 3. a controller target is resolved to a fresh controller instance, its
//!    applicable middleware is discovered and turned into a controller-scope
//!    [`Pipeline`], and the action is invoked as the pipeline's endpoint
//!
//! ```rust,ignore
//! let dispatcher = Dispatcher::builder()
//!     .config(DispatchConfig::default())
//!     .controller_default::<User>("app.controller.User")
//!     .middleware("auth", Auth)
//!     .build();
//!
//! let reply = dispatcher
//!     .dispatch(Request::get("/user/show").with_param("id", 7), RouteMatch::path("user/show"))
//!     .await?;
//! ```
//!
//! Errors are returned untouched; rendering them is the caller's concern.

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tracing::{Instrument, Span, debug, debug_span, field};

use crate::binder;
use crate::container::Services;
use crate::controller::Controller;
use crate::middleware::{Middleware, MiddlewareRegistry, MiddlewareSpec, discover};
use crate::pipeline::{CONTROLLER_SCOPE, Pipeline, Stage};
use crate::resolver::{ControllerRegistry, ControllerResolver};
use switchyard_core::{
    BoxError, ControllerAction, DispatchConfig, DispatchError, DispatchResult, DispatchTarget,
    Reply, Request, ReservedRoutes, RouteMatch,
};

struct Inner {
    config: Arc<DispatchConfig>,
    resolver: ControllerResolver,
    middleware: MiddlewareRegistry,
    reserved: ReservedRoutes,
}

/// Resolves matched routes and runs them.
///
/// Cheap to clone; all clones share the same registries.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

impl Dispatcher {
    /// Starts building a dispatcher.
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    /// The dispatch configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.inner.config
    }

    /// The controller resolver.
    pub fn resolver(&self) -> &ControllerResolver {
        &self.inner.resolver
    }

    /// The middleware registry.
    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.inner.middleware
    }

    /// Routes reserved by explicit definitions.
    pub fn reserved(&self) -> &ReservedRoutes {
        &self.inner.reserved
    }

    /// Builds pipeline stages for `specs` from the registry.
    pub fn stages(&self, specs: &[MiddlewareSpec]) -> DispatchResult<Vec<Stage>> {
        self.inner.middleware.stages(specs)
    }

    /// Resolves `route` against `request` without running anything.
    pub fn resolve(&self, request: &mut Request, route: RouteMatch) -> DispatchResult<DispatchTarget> {
        DispatchTarget::resolve(route, request, &self.inner.config, &self.inner.reserved)
    }

    /// Dispatches `request` to the target `route` resolves to.
    pub async fn dispatch(&self, mut request: Request, route: RouteMatch) -> DispatchResult<Reply> {
        let span = debug_span!(
            "dispatch",
            method = %request.method(),
            path = %request.path(),
            controller = field::Empty,
            action = field::Empty,
        );
        async move {
            let target = self.resolve(&mut request, route)?;
            if let Some(resolved) = target.controller_action() {
                let current = Span::current();
                current.record("controller", resolved.controller.as_str());
                current.record("action", resolved.action.as_str());
            }
            self.execute(request, target).await
        }
        .instrument(span)
        .await
    }

    /// Runs an already resolved target.
    pub async fn execute(&self, request: Request, target: DispatchTarget) -> DispatchResult<Reply> {
        match target {
            DispatchTarget::Callback { callback, extra } => {
                debug!("Dispatching to callback");
                let mut params = request.params();
                params.extend(extra);
                callback.call(params).await
            }
            DispatchTarget::Controller(target) | DispatchTarget::UrlDerived(target) => {
                self.run_controller(request, target).await
            }
        }
    }

    async fn run_controller(&self, request: Request, target: ControllerAction) -> DispatchResult<Reply> {
        let ControllerAction {
            controller,
            action,
            param,
        } = target;

        let handler = self.inner.resolver.resolve(&controller)?;
        debug!(class = %handler.class, action = %action, "Dispatching to controller");

        let specs = discover(&*handler.instance, &action);
        let stages = self.inner.middleware.stages(&specs)?;

        Pipeline::new(CONTROLLER_SCOPE)
            .through(stages)
            .then(request, move |request: Request| async move {
                let mut params = request.params();
                params.extend(param);
                binder::invoke(&*handler.instance, &handler.class, &action, &request, params).await
            })
            .await
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.inner.config)
            .field("resolver", &self.inner.resolver)
            .field("middleware", &self.inner.middleware)
            .field("reserved", &self.inner.reserved.len())
            .finish()
    }
}

// ============================================================================
// DispatcherBuilder
// ============================================================================

/// Builder for [`Dispatcher`].
#[derive(Debug, Default)]
pub struct DispatcherBuilder {
    config: DispatchConfig,
    controllers: ControllerRegistry,
    middleware: MiddlewareRegistry,
    services: Services,
    reserved: ReservedRoutes,
}

impl DispatcherBuilder {
    /// Sets the dispatch configuration.
    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers a controller factory under its class name.
    pub fn controller<F, C>(mut self, class: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Services) -> Result<C, BoxError> + Send + Sync + 'static,
        C: Controller,
    {
        self.controllers.register(class, factory);
        self
    }

    /// Registers a [`Default`]-constructed controller under its class name.
    pub fn controller_default<C: Controller + Default>(mut self, class: impl Into<String>) -> Self {
        self.controllers.register_default::<C>(class);
        self
    }

    /// Replaces the controller registry.
    pub fn controllers(mut self, registry: ControllerRegistry) -> Self {
        self.controllers = registry;
        self
    }

    /// Registers a middleware under `name`.
    pub fn middleware<M: Middleware>(mut self, name: impl Into<String>, middleware: M) -> Self {
        self.middleware.register(name, middleware);
        self
    }

    /// Replaces the middleware registry.
    pub fn middleware_registry(mut self, registry: MiddlewareRegistry) -> Self {
        self.middleware = registry;
        self
    }

    /// Adds a service for controller factories.
    pub fn service<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.services.insert(value);
        self
    }

    /// Adds an already shared service, possibly a trait object.
    pub fn provide<T: ?Sized + Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.services.provide(service);
        self
    }

    /// Replaces the service container.
    pub fn services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    /// Reserves a `controller/action` path for an explicit route, so the
    /// URL-derived form is rejected.
    pub fn reserve_route(mut self, path: &str) -> Self {
        self.reserved.reserve(path);
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Dispatcher {
        let config = Arc::new(self.config);
        let resolver = ControllerResolver::new(Arc::clone(&config), self.controllers, self.services);
        Dispatcher {
            inner: Arc::new(Inner {
                config,
                resolver,
                middleware: self.middleware,
                reserved: self.reserved,
            }),
        }
    }
}

// ============================================================================
// tower integration
// ============================================================================

/// A request paired with its route-matcher result.
#[derive(Debug)]
pub struct DispatchRequest {
    /// The incoming request.
    pub request: Request,
    /// What the route matcher resolved it to.
    pub route: RouteMatch,
}

impl DispatchRequest {
    /// Creates a dispatch request.
    pub fn new(request: Request, route: RouteMatch) -> Self {
        Self { request, route }
    }
}

impl tower::Service<DispatchRequest> for Dispatcher {
    type Response = Reply;
    type Error = DispatchError;
    type Future = BoxFuture<'static, DispatchResult<Reply>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: DispatchRequest) -> Self::Future {
        let dispatcher = self.clone();
        Box::pin(async move { dispatcher.dispatch(req.request, req.route).await })
    }
}
