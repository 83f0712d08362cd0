//! The application kernel.
//!
//! [`App`] owns the validated [`AppConfig`] and a [`Dispatcher`], and runs a
//! `global` middleware scope, configured by `global_middleware`, around
//! every dispatch:
//!
//! ```text
//! global pipeline ──▶ dispatcher ──▶ controller pipeline ──▶ action
//! ```
//!
//! It is also the place where dispatch errors are turned into replies for a
//! transport ([`App::handle_or_render`]).

use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::{AppConfig, validate_config};
use crate::error::RuntimeResult;
use switchyard_core::{BoxError, DispatchError, DispatchResult, Reply, Request, RouteMatch};
use switchyard_framework::{
    Controller, DispatchRequest, Dispatcher, DispatcherBuilder, GLOBAL_SCOPE, Middleware,
    MiddlewareSpec, Pipeline, Services, Stage,
};

struct AppInner {
    config: AppConfig,
    dispatcher: Dispatcher,
    global: Vec<Stage>,
}

/// A configured dispatcher wrapped in the global middleware scope.
///
/// Cheap to clone.
#[derive(Clone)]
pub struct App {
    inner: Arc<AppInner>,
}

impl App {
    /// Starts building an application from `config`.
    pub fn builder(config: AppConfig) -> AppBuilder {
        AppBuilder::new(config)
    }

    /// The application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// The underlying dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// The global middleware stages, outermost first.
    pub fn global_stages(&self) -> &[Stage] {
        &self.inner.global
    }

    /// Runs `request` through the global scope and the dispatcher.
    pub async fn handle(&self, request: Request, route: RouteMatch) -> DispatchResult<Reply> {
        let dispatcher = self.inner.dispatcher.clone();
        Pipeline::new(GLOBAL_SCOPE)
            .through(self.inner.global.iter().cloned())
            .then(request, move |request: Request| async move {
                dispatcher.dispatch(request, route).await
            })
            .await
    }

    /// Like [`handle`](Self::handle), rendering any failure with
    /// [`render_error`].
    pub async fn handle_or_render(&self, request: Request, route: RouteMatch) -> Reply {
        match self.handle(request, route).await {
            Ok(reply) => reply,
            Err(err) => render_error(&err),
        }
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("config", &self.inner.config)
            .field("dispatcher", &self.inner.dispatcher)
            .field("global", &self.inner.global)
            .finish()
    }
}

impl tower::Service<DispatchRequest> for App {
    type Response = Reply;
    type Error = DispatchError;
    type Future = BoxFuture<'static, DispatchResult<Reply>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: DispatchRequest) -> Self::Future {
        let app = self.clone();
        Box::pin(async move { app.handle(req.request, req.route).await })
    }
}

/// Turns a dispatch error into a JSON error reply with its status code.
///
/// Not-found and binding failures are logged at `warn`, everything else at
/// `error`.
pub fn render_error(err: &DispatchError) -> Reply {
    let status = err.status_code();
    if status >= 500 {
        error!(error = %err, status, "Dispatch failed");
    } else {
        warn!(error = %err, status, "Dispatch rejected");
    }
    Reply::json(json!({ "error": err.to_string(), "status": status })).with_status(status)
}

// ============================================================================
// AppBuilder
// ============================================================================

/// Builder for [`App`].
#[derive(Debug)]
pub struct AppBuilder {
    config: AppConfig,
    dispatcher: DispatcherBuilder,
}

impl AppBuilder {
    /// Creates a builder from `config`.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            dispatcher: Dispatcher::builder(),
        }
    }

    /// Registers a controller factory under its class name.
    pub fn controller<F, C>(mut self, class: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Services) -> Result<C, BoxError> + Send + Sync + 'static,
        C: Controller,
    {
        self.dispatcher = self.dispatcher.controller(class, factory);
        self
    }

    /// Registers a [`Default`]-constructed controller under its class name.
    pub fn controller_default<C: Controller + Default>(mut self, class: impl Into<String>) -> Self {
        self.dispatcher = self.dispatcher.controller_default::<C>(class);
        self
    }

    /// Registers a middleware, usable both globally and by controllers.
    pub fn middleware<M: Middleware>(mut self, name: impl Into<String>, middleware: M) -> Self {
        self.dispatcher = self.dispatcher.middleware(name, middleware);
        self
    }

    /// Adds a service for controller factories.
    pub fn service<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.dispatcher = self.dispatcher.service(value);
        self
    }

    /// Adds an already shared service, possibly a trait object.
    pub fn provide<T: ?Sized + Send + Sync + 'static>(mut self, service: Arc<T>) -> Self {
        self.dispatcher = self.dispatcher.provide(service);
        self
    }

    /// Reserves a `controller/action` path for an explicit route.
    pub fn reserve_route(mut self, path: &str) -> Self {
        self.dispatcher = self.dispatcher.reserve_route(path);
        self
    }

    /// Validates the configuration and builds the application.
    ///
    /// Every `global_middleware` identifier must name a registered middleware.
    pub fn build(self) -> RuntimeResult<App> {
        validate_config(&self.config)?;

        let dispatcher = self
            .dispatcher
            .config(self.config.dispatch.clone())
            .build();

        let specs: Vec<MiddlewareSpec> = self
            .config
            .global_middleware
            .iter()
            .map(|identifier| MiddlewareSpec::parse(identifier))
            .collect();
        let global = dispatcher.stages(&specs)?;

        info!(
            namespace = %self.config.dispatch.namespace,
            controllers = dispatcher.resolver().registry().len(),
            middleware = dispatcher.middleware().len(),
            global = global.len(),
            "Application ready"
        );

        Ok(App {
            inner: Arc::new(AppInner {
                config: self.config,
                dispatcher,
                global,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RuntimeError;
    use serde_json::Value;
    use parking_lot::Mutex;
    use switchyard_framework::{Arguments, DeclaresMiddleware, Next, middleware_fn};
    use tower::ServiceExt;

    type Log = Arc<Mutex<Vec<String>>>;

    #[derive(Default)]
    struct Index;

    impl DeclaresMiddleware for Index {
        fn middleware(&self) -> Vec<MiddlewareSpec> {
            vec![MiddlewareSpec::new("record:controller")]
        }
    }

    impl Controller for Index {
        fn actions(&self) -> &'static [&'static str] {
            &["index"]
        }

        fn call<'a>(
            &'a self,
            _action: &'a str,
            _request: &'a Request,
            _args: Arguments,
        ) -> BoxFuture<'a, DispatchResult<Reply>> {
            Box::pin(async { Ok(Reply::text("home")) })
        }
    }

    fn recorder(log: &Log) -> impl Middleware {
        let log = Arc::clone(log);
        middleware_fn(move |request: Request, next: Next, params: Vec<Value>| {
            let log = Arc::clone(&log);
            async move {
                let tag = params
                    .first()
                    .and_then(Value::as_str)
                    .unwrap_or("?")
                    .to_string();
                log.lock().push(format!("{tag}:{}", next.scope()));
                next.run(request).await
            }
        })
    }

    fn app(log: &Log, global: &[&str]) -> RuntimeResult<App> {
        let config = AppConfig {
            global_middleware: global.iter().map(|s| s.to_string()).collect(),
            ..AppConfig::default()
        };
        App::builder(config)
            .controller_default::<Index>("app.controller.Index")
            .middleware("record", recorder(log))
            .build()
    }

    #[tokio::test]
    async fn test_global_scope_wraps_controller_scope() {
        let log: Log = Arc::default();
        let app = app(&log, &["record:global"]).unwrap();

        let reply = app
            .handle(Request::get("/"), RouteMatch::path("/"))
            .await
            .unwrap();

        assert_eq!(reply.body(), &Value::from("home"));
        assert_eq!(
            *log.lock(),
            ["global:global", "controller:controller"]
        );
    }

    #[test]
    fn test_unknown_global_middleware() {
        let log: Log = Arc::default();
        let err = app(&log, &["missing"]).unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownMiddleware(name) if name == "missing"));
    }

    #[tokio::test]
    async fn test_render_not_found() {
        let log: Log = Arc::default();
        let app = app(&log, &[]).unwrap();
        let reply = app
            .handle_or_render(Request::get("/ghost"), RouteMatch::path("ghost"))
            .await;
        assert_eq!(reply.status(), 404);
        assert_eq!(reply.body()["status"], 404);
    }

    #[tokio::test]
    async fn test_tower_service() {
        let log: Log = Arc::default();
        let reply = app(&log, &[])
            .unwrap()
            .oneshot(DispatchRequest::new(Request::get("/"), RouteMatch::path("index")))
            .await
            .unwrap();
        assert_eq!(reply.body(), &Value::from("home"));
    }
}
