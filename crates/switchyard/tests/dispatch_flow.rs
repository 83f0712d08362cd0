//! End-to-end dispatch through `App`: URL-derived targets, generated
//! controllers, declared middleware, fallbacks and the global scope.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{Value, json};
use switchyard::prelude::*;
use switchyard::framework::DispatchRequest;
use switchyard::runtime::RuntimeResult;
use tower::ServiceExt;

type Log = Arc<Mutex<Vec<String>>>;

struct PostStore {
    titles: Vec<&'static str>,
}

#[derive(Debug, Clone)]
struct User(String);

#[derive(Serialize)]
struct Summary {
    count: usize,
    latest: Option<&'static str>,
}

struct Posts {
    store: Arc<PostStore>,
}

#[controller]
impl Posts {
    #[middleware]
    fn declared(&self) -> Vec<MiddlewareSpec> {
        vec![
            MiddlewareSpec::new("trace:posts"),
            MiddlewareSpec::new("auth").only("edit, delete"),
        ]
    }

    async fn show(&self, id: usize) -> DispatchResult<String> {
        self.store
            .titles
            .get(id)
            .map(|title| title.to_string())
            .ok_or_else(|| DispatchError::invalid_argument("id", "no such post"))
    }

    fn edit(&self, request: &Request, id: usize) -> Json<Value> {
        let user = request.extension::<User>().map(|user| user.0.clone());
        Json(json!({ "id": id, "user": user }))
    }

    fn search(&self, q: Option<String>) -> String {
        q.unwrap_or_default()
    }

    fn summary(&self) -> Json<Summary> {
        Json(Summary {
            count: self.store.titles.len(),
            latest: self.store.titles.last().copied(),
        })
    }

    #[fallback]
    fn missing(&self, action: String, params: Params) -> Json<Value> {
        Json(json!({ "action": action, "params": params }))
    }
}

#[derive(Default)]
struct Error;

#[controller]
impl Error {
    #[fallback]
    fn not_found(&self, action: String, _params: Params) -> Reply {
        Reply::text(format!("nothing at {action}")).with_status(404)
    }
}

struct Auth;

#[async_trait]
impl Middleware for Auth {
    async fn handle(
        &self,
        mut request: Request,
        next: Next,
        _params: &[Value],
    ) -> DispatchResult<Reply> {
        let token = request
            .param("token")
            .and_then(Value::as_str)
            .map(str::to_owned);
        match token {
            Some(token) => {
                request.insert_extension(User(token));
                next.run(request).await
            }
            None => Ok(Reply::text("unauthorized").with_status(401)),
        }
    }
}

fn tracer(log: &Log) -> impl Middleware {
    let log = Arc::clone(log);
    middleware_fn(move |request: Request, next: Next, params: Vec<Value>| {
        let log = Arc::clone(&log);
        async move {
            let tag = params
                .first()
                .and_then(Value::as_str)
                .unwrap_or("?")
                .to_string();
            log.lock().push(format!("{tag}:before"));
            let reply = next.run(request).await;
            log.lock().push(format!("{tag}:after"));
            reply
        }
    })
}

struct Fixture {
    app: App,
    log: Log,
    constructed: Arc<AtomicUsize>,
}

fn fixture(config: AppConfig, with_error_controller: bool) -> RuntimeResult<Fixture> {
    let log: Log = Arc::default();
    let constructed = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&constructed);

    let mut builder = App::builder(config)
        .provide(Arc::new(PostStore {
            titles: vec!["first", "second"],
        }))
        .controller("app.controller.Posts", move |services: &Services| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Posts {
                store: services.require::<PostStore>()?,
            })
        })
        .middleware("trace", tracer(&log))
        .middleware("auth", Auth);
    if with_error_controller {
        builder = builder.controller_default::<Error>("app.controller.Error");
    }

    Ok(Fixture {
        app: builder.build()?,
        log,
        constructed,
    })
}

fn global_config() -> AppConfig {
    AppConfig {
        global_middleware: vec!["trace:global".into()],
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_url_derived_action_under_both_scopes() {
    let fx = fixture(global_config(), false).unwrap();

    let reply = fx
        .app
        .handle(
            Request::get("/posts/show").with_param("id", 1),
            RouteMatch::path("posts/show"),
        )
        .await
        .unwrap();

    assert_eq!(reply.body(), &json!("second"));
    assert_eq!(
        *fx.log.lock(),
        ["global:before", "posts:before", "posts:after", "global:after"]
    );
}

#[tokio::test]
async fn test_only_filter_and_short_circuit() {
    let fx = fixture(AppConfig::default(), false).unwrap();

    let denied = fx
        .app
        .handle(
            Request::get("/posts/edit").with_param("id", 0),
            RouteMatch::path("posts/edit"),
        )
        .await
        .unwrap();
    assert_eq!(denied.status(), 401);

    let allowed = fx
        .app
        .handle(
            Request::get("/posts/edit")
                .with_param("id", 0)
                .with_param("token", "ada"),
            RouteMatch::path("posts/Edit"),
        )
        .await
        .unwrap();
    assert_eq!(allowed.body(), &json!({ "id": 0, "user": "ada" }));

    // `show` is outside the `only` set, so no token is needed.
    let open = fx
        .app
        .handle(
            Request::get("/posts/show").with_param("id", 0),
            RouteMatch::path("posts/show"),
        )
        .await
        .unwrap();
    assert_eq!(open.body(), &json!("first"));
}

#[tokio::test]
async fn test_fallback_receives_action_and_bag() {
    let fx = fixture(AppConfig::default(), false).unwrap();

    let reply = fx
        .app
        .handle(
            Request::get("/posts/archive").with_param("year", 2024),
            RouteMatch::path("posts/archive"),
        )
        .await
        .unwrap();

    assert_eq!(
        reply.body(),
        &json!({ "action": "archive", "params": { "year": 2024 } })
    );
}

#[tokio::test]
async fn test_optional_and_invalid_arguments() {
    let fx = fixture(AppConfig::default(), false).unwrap();

    let reply = fx
        .app
        .handle(Request::get("/posts/search"), RouteMatch::path("posts/search"))
        .await
        .unwrap();
    assert_eq!(reply.body(), &json!(""));

    let err = fx
        .app
        .handle(
            Request::get("/posts/show").with_param("id", "two"),
            RouteMatch::path("posts/show"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DispatchError::InvalidArgument { ref name, .. } if name == "id"));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_fresh_instance_per_dispatch() {
    let fx = fixture(AppConfig::default(), false).unwrap();

    for _ in 0..3 {
        fx.app
            .handle(
                Request::get("/posts/show").with_param("id", 0),
                RouteMatch::controller("posts", "show"),
            )
            .await
            .unwrap();
    }

    assert_eq!(fx.constructed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_unknown_controller() {
    let fx = fixture(AppConfig::default(), false).unwrap();
    let reply = fx
        .app
        .handle_or_render(Request::get("/ghost"), RouteMatch::path("ghost"))
        .await;
    assert_eq!(reply.status(), 404);
    assert_eq!(
        reply.body()["error"],
        json!("controller class not exists: app.controller.Ghost")
    );

    let fx = fixture(AppConfig::default(), true).unwrap();
    let reply = fx
        .app
        .handle(Request::get("/ghost/list"), RouteMatch::path("ghost/list"))
        .await
        .unwrap();
    assert_eq!(reply.status(), 404);
    assert_eq!(reply.body(), &json!("nothing at list"));
}

#[tokio::test]
async fn test_callback_target_skips_controller_scope() {
    let fx = fixture(global_config(), false).unwrap();

    let route = RouteMatch::callback(|params: Params| async move {
        Json(params)
    })
    .with_extra("page", 2);

    let reply = fx
        .app
        .handle(Request::get("/feed").with_param("page", 1), route)
        .await
        .unwrap();

    assert_eq!(reply.body(), &json!({ "page": 2 }));
    assert_eq!(*fx.log.lock(), ["global:before", "global:after"]);
}

#[tokio::test]
async fn test_app_as_tower_service() {
    let fx = fixture(global_config(), false).unwrap();

    let reply = fx
        .app
        .clone()
        .oneshot(DispatchRequest::new(
            Request::get("/posts/summary"),
            RouteMatch::path("posts/summary"),
        ))
        .await
        .unwrap();

    assert_eq!(reply.body(), &json!({ "count": 2, "latest": "second" }));
    assert_eq!(
        *fx.log.lock(),
        ["global:before", "posts:before", "posts:after", "global:after"]
    );

    let err = fx
        .app
        .clone()
        .oneshot(DispatchRequest::new(
            Request::get("/-bad"),
            RouteMatch::path("-bad"),
        ))
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), 404);
}
