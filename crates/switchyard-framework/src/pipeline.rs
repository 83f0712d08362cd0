//! Middleware pipeline.
//!
//! A [`Pipeline`] is an ordered list of [`Stage`]s run around an endpoint as
//! a nested onion: stage 0 wraps stage 1 wraps … wraps the endpoint. Stages
//! run one after another on the caller's task; the pipeline never reorders,
//! deduplicates or parallelises them.
//!
//! ```text
//! A-before ─▶ B-before ─▶ C-before ─▶ endpoint
//! A-after  ◀─ B-after  ◀─ C-after  ◀──────┘
//! ```
//!
//! A pipeline is built per request and consumed by [`Pipeline::then`].
//! Pipelines are identified by a scope name so the same executor can serve
//! a global scope, a controller scope, or any other.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{Instrument, debug_span, trace};

use crate::middleware::Middleware;
use switchyard_core::{DispatchResult, Reply, Request};

/// Scope name of the pipeline wrapping controller actions.
pub const CONTROLLER_SCOPE: &str = "controller";

/// Scope name of the pipeline wrapping the whole dispatch.
pub const GLOBAL_SCOPE: &str = "global";

/// The innermost call of a pipeline.
type Endpoint = Box<dyn FnOnce(Request) -> BoxFuture<'static, DispatchResult<Reply>> + Send>;

// ============================================================================
// Stage
// ============================================================================

/// A middleware bound to its declaration parameters.
#[derive(Clone)]
pub struct Stage {
    name: Arc<str>,
    middleware: Arc<dyn Middleware>,
    params: Arc<[Value]>,
}

impl Stage {
    /// Creates a stage.
    pub fn new(
        name: impl Into<Arc<str>>,
        middleware: Arc<dyn Middleware>,
        params: Vec<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            middleware,
            params: params.into(),
        }
    }

    /// The middleware name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declaration parameters.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Next
// ============================================================================

/// The continuation handed to each middleware.
///
/// Calling [`run`](Next::run) executes the remaining stages and the endpoint.
/// Dropping it without calling `run` short-circuits the chain.
pub struct Next {
    scope: Arc<str>,
    remaining: VecDeque<Stage>,
    endpoint: Endpoint,
}

impl Next {
    /// Runs the rest of the chain.
    pub async fn run(mut self, request: Request) -> DispatchResult<Reply> {
        match self.remaining.pop_front() {
            Some(stage) => {
                trace!(scope = %self.scope, middleware = %stage.name, "entering middleware");
                stage.middleware.handle(request, self, &stage.params).await
            }
            None => {
                trace!(scope = %self.scope, "entering endpoint");
                (self.endpoint)(request).await
            }
        }
    }

    /// The scope of the pipeline this continuation belongs to.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Number of stages still ahead of the endpoint.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

impl std::fmt::Debug for Next {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("scope", &self.scope)
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// An ordered chain of middleware stages for one request.
#[derive(Debug)]
pub struct Pipeline {
    scope: Arc<str>,
    stages: Vec<Stage>,
}

impl Pipeline {
    /// Creates an empty pipeline for `scope`.
    pub fn new(scope: impl Into<Arc<str>>) -> Self {
        Self {
            scope: scope.into(),
            stages: Vec::new(),
        }
    }

    /// Appends stages, outermost first (builder pattern).
    pub fn through(mut self, stages: impl IntoIterator<Item = Stage>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Appends a single stage (builder pattern).
    pub fn pipe(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// The scope name.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The stages, outermost first.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if there are no stages.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs `request` through every stage and finally `endpoint`.
    pub async fn then<F, Fut>(self, request: Request, endpoint: F) -> DispatchResult<Reply>
    where
        F: FnOnce(Request) -> Fut + Send + 'static,
        Fut: Future<Output = DispatchResult<Reply>> + Send + 'static,
    {
        let span = debug_span!("pipeline", scope = %self.scope, stages = self.stages.len());
        let boxed: Endpoint = Box::new(
            move |request: Request| -> BoxFuture<'static, DispatchResult<Reply>> {
                Box::pin(endpoint(request))
            },
        );
        let next = Next {
            scope: self.scope,
            remaining: self.stages.into(),
            endpoint: boxed,
        };
        next.run(request).instrument(span).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::middleware_fn;
    use parking_lot::Mutex;
    use serde_json::json;
    use switchyard_core::DispatchError;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording(name: &'static str, log: &Log) -> Stage {
        let log = Arc::clone(log);
        let middleware = middleware_fn(move |request: Request, next: Next, _params: Vec<Value>| {
            let log = Arc::clone(&log);
            async move {
                log.lock().push(format!("{name}-before"));
                let reply = next.run(request).await;
                log.lock().push(format!("{name}-after"));
                reply
            }
        });
        Stage::new(name, Arc::new(middleware), Vec::new())
    }

    fn endpoint(
        log: &Log,
    ) -> impl FnOnce(Request) -> BoxFuture<'static, DispatchResult<Reply>> + Send + 'static {
        let log = Arc::clone(log);
        move |_request: Request| -> BoxFuture<'static, DispatchResult<Reply>> {
            Box::pin(async move {
                log.lock().push("handler".to_string());
                Ok(Reply::text("done"))
            })
        }
    }

    #[tokio::test]
    async fn test_onion_order() {
        let log: Log = Arc::default();
        let reply = Pipeline::new("test")
            .through([recording("A", &log), recording("B", &log), recording("C", &log)])
            .then(Request::get("/"), endpoint(&log))
            .await
            .unwrap();

        assert_eq!(reply.body(), &json!("done"));
        assert_eq!(
            *log.lock(),
            [
                "A-before", "B-before", "C-before", "handler", "C-after", "B-after", "A-after"
            ]
        );
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let log: Log = Arc::default();
        let guard = middleware_fn(|_request: Request, _next: Next, _params: Vec<Value>| async {
            Ok::<_, DispatchError>(Reply::text("denied").with_status(403))
        });

        let reply = Pipeline::new("test")
            .pipe(recording("A", &log))
            .pipe(Stage::new("guard", Arc::new(guard), Vec::new()))
            .pipe(recording("C", &log))
            .then(Request::get("/"), endpoint(&log))
            .await
            .unwrap();

        assert_eq!(reply.status(), 403);
        assert_eq!(*log.lock(), ["A-before", "A-after"]);
    }

    #[tokio::test]
    async fn test_post_processing() {
        let stamp = middleware_fn(|request: Request, next: Next, params: Vec<Value>| async move {
            let reply = next.run(request).await?;
            let tag = params.first().and_then(Value::as_str).unwrap_or("none").to_string();
            Ok::<_, DispatchError>(reply.with_header("x-tag", tag))
        });

        let reply = Pipeline::new("test")
            .pipe(Stage::new("stamp", Arc::new(stamp), vec![json!("v1")]))
            .then(Request::get("/"), |_request| async { Ok::<_, DispatchError>(Reply::empty()) })
            .await
            .unwrap();

        assert_eq!(reply.header("x-tag"), Some("v1"));
    }

    #[tokio::test]
    async fn test_failure_aborts_chain() {
        let log: Log = Arc::default();
        let failing = middleware_fn(|_request: Request, _next: Next, _params: Vec<Value>| async {
            Err::<Reply, _>(DispatchError::abort("rate limited"))
        });

        let err = Pipeline::new("test")
            .pipe(recording("A", &log))
            .pipe(Stage::new("failing", Arc::new(failing), Vec::new()))
            .then(Request::get("/"), endpoint(&log))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "rate limited");
        assert_eq!(*log.lock(), ["A-before", "A-after"]);
    }

    #[tokio::test]
    async fn test_middleware_mutates_request() {
        let tagger = middleware_fn(|mut request: Request, next: Next, _params: Vec<Value>| async move {
            request.set_param("tagged", true);
            next.run(request).await
        });

        let reply = Pipeline::new("test")
            .pipe(Stage::new("tagger", Arc::new(tagger), Vec::new()))
            .then(Request::get("/"), |request: Request| async move {
                Ok::<_, DispatchError>(Reply::new(
                    request.param("tagged").cloned().unwrap_or_default(),
                ))
            })
            .await
            .unwrap();

        assert_eq!(reply.body(), &json!(true));
    }

    #[tokio::test]
    async fn test_empty_pipeline_calls_endpoint() {
        let log: Log = Arc::default();
        let pipeline = Pipeline::new(GLOBAL_SCOPE);
        assert!(pipeline.is_empty());
        pipeline.then(Request::get("/"), endpoint(&log)).await.unwrap();
        assert_eq!(*log.lock(), ["handler"]);
    }
}
