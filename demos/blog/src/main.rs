//! Blog Example
//!
//! A small blog served by the Switchyard dispatch layer, driven from the
//! command line instead of a real transport.
//!
//! # Routing
//!
//! Every argument is a path with an optional query string. `health` is an
//! explicit callback route; everything else is URL-derived:
//!
//! ```text
//! ""                      → Home::index
//! posts/show?id=1         → Posts::show(id)
//! posts/create?title=Hi   → Posts::create(title), behind `auth`
//! posts/archive           → Posts's fallback
//! admin.dashboard         → admin.Dashboard::index
//! nowhere                 → Missing (the empty controller)
//! ```
//!
//! # Usage
//!
//! ```bash
//! cargo run --package switchyard-blog -- posts/show?id=0 "posts/create?title=Hello&token=letmein"
//! SWITCHYARD_LOGGING__LEVEL=debug cargo run --package switchyard-blog
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::{Value, json};
use switchyard::prelude::*;
use switchyard::runtime::{ConfigError, logging};
use tracing::info;

// ============================================================================
// Storage
// ============================================================================

/// Post storage seen by controllers.
trait PostStore: Send + Sync {
    fn list(&self) -> Vec<PostView>;
    fn get(&self, id: u64) -> Option<PostView>;
    fn insert(&self, title: String) -> PostView;
}

#[derive(Debug, Clone, Serialize)]
struct PostView {
    id: u64,
    title: String,
}

#[derive(Default)]
struct MemoryStore {
    posts: RwLock<Vec<String>>,
}

impl MemoryStore {
    fn seeded() -> Self {
        Self {
            posts: RwLock::new(vec!["Hello, Switchyard".into(), "Onion pipelines".into()]),
        }
    }
}

impl PostStore for MemoryStore {
    fn list(&self) -> Vec<PostView> {
        self.posts
            .read()
            .iter()
            .enumerate()
            .map(|(id, title)| PostView {
                id: id as u64,
                title: title.clone(),
            })
            .collect()
    }

    fn get(&self, id: u64) -> Option<PostView> {
        let posts = self.posts.read();
        posts.get(id as usize).map(|title| PostView {
            id,
            title: title.clone(),
        })
    }

    fn insert(&self, title: String) -> PostView {
        let mut posts = self.posts.write();
        posts.push(title.clone());
        PostView {
            id: posts.len() as u64 - 1,
            title,
        }
    }
}

// ============================================================================
// Controllers
// ============================================================================

#[derive(Default)]
struct Home;

#[controller]
impl Home {
    fn index(&self) -> &'static str {
        "Welcome to the Switchyard blog"
    }
}

struct Posts {
    store: Arc<dyn PostStore>,
}

#[controller]
impl Posts {
    #[middleware]
    fn declared(&self) -> Vec<MiddlewareSpec> {
        vec![MiddlewareSpec::new("auth").only("create")]
    }

    fn index(&self) -> Json<Vec<PostView>> {
        Json(self.store.list())
    }

    async fn show(&self, id: u64) -> Option<Json<PostView>> {
        self.store.get(id).map(Json)
    }

    async fn create(&self, request: &Request, title: String) -> Json<Value> {
        let author = request.extension::<Author>().map(|a| a.0.clone());
        let post = self.store.insert(title);
        Json(json!({ "created": post, "author": author }))
    }

    #[fallback]
    fn unknown(&self, action: String, params: Params) -> Reply {
        Reply::json(json!({ "unknown_action": action, "params": params })).with_status(404)
    }
}

#[derive(Default)]
struct Dashboard;

#[controller]
impl Dashboard {
    fn index(&self) -> Json<Value> {
        Json(json!({ "section": "admin" }))
    }
}

#[derive(Default)]
struct Missing;

#[controller]
impl Missing {
    #[fallback]
    fn not_found(&self, action: String, _params: Params) -> Reply {
        Reply::text(format!("Nothing here (action '{action}')")).with_status(404)
    }
}

// ============================================================================
// Middleware
// ============================================================================

/// The authenticated user, set by [`Auth`].
#[derive(Debug, Clone)]
struct Author(String);

/// Requires `token` to match; short-circuits with 401 otherwise.
struct Auth {
    token: String,
}

#[async_trait]
impl Middleware for Auth {
    async fn handle(
        &self,
        mut request: Request,
        next: Next,
        _params: &[Value],
    ) -> DispatchResult<Reply> {
        let supplied = request.param("token").and_then(Value::as_str);
        if supplied != Some(self.token.as_str()) {
            info!(path = %request.path(), "Rejected unauthenticated request");
            return Ok(Reply::text("unauthorized").with_status(401));
        }
        request.insert_extension(Author("editor".into()));
        next.run(request).await
    }
}

/// Adds the elapsed time as a header.
struct Timing;

#[async_trait]
impl Middleware for Timing {
    async fn handle(&self, request: Request, next: Next, _params: &[Value]) -> DispatchResult<Reply> {
        let started = Instant::now();
        let reply = next.run(request).await?;
        Ok(reply.with_header("x-elapsed-us", started.elapsed().as_micros().to_string()))
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[derive(Parser, Debug)]
#[command(about = "Dispatch requests against the demo blog")]
struct Args {
    /// Configuration file (default: search this demo's directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile
    #[arg(short, long)]
    profile: Option<String>,

    /// Token accepted by the `auth` middleware
    #[arg(long, default_value = "letmein")]
    token: String,

    /// Paths to dispatch, e.g. `posts/show?id=1`
    paths: Vec<String>,
}

/// Splits `path?a=1&b=x` into a request; numeric values stay numbers.
fn parse_request(line: &str) -> (String, Request) {
    let (path, query) = line.split_once('?').unwrap_or((line, ""));
    let path = path.trim_matches('/').to_string();
    let mut request = Request::get(format!("/{path}"));
    for pair in query.split('&').filter(|pair| !pair.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let value = match value.parse::<i64>() {
            Ok(number) => Value::from(number),
            Err(_) => Value::from(value),
        };
        request.set_param(key, value);
    }
    (path, request)
}

fn route_for(path: &str) -> RouteMatch {
    match path {
        "health" => RouteMatch::callback(|params: Params| async move {
            Json(json!({ "status": "ok", "params": params }))
        })
        .with_extra("service", "blog"),
        _ => RouteMatch::path(path),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new().search_path(env!("CARGO_MANIFEST_DIR"));
    if let Some(profile) = &args.profile {
        loader = loader.profile(profile);
    }
    if let Some(path) = &args.config {
        loader = loader.file(path);
    }
    let config = match loader.load() {
        Ok(config) => config,
        Err(ConfigError::FileNotFound(path)) => {
            anyhow::bail!("configuration file not found: {}", path.display())
        }
        Err(e) => return Err(e.into()),
    };
    logging::init_from_config(&config.logging);

    let store: Arc<dyn PostStore> = Arc::new(MemoryStore::seeded());
    let app = App::builder(config)
        .provide(store)
        .controller_default::<Home>("blog.controller.Home")
        .controller("blog.controller.Posts", |services: &Services| {
            Ok(Posts {
                store: services.require::<dyn PostStore>()?,
            })
        })
        .controller_default::<Dashboard>("blog.controller.admin.Dashboard")
        .controller_default::<Missing>("blog.controller.Missing")
        .middleware("auth", Auth { token: args.token })
        .middleware("timing", Timing)
        .reserve_route("home/about")
        .build()?;

    let paths = if args.paths.is_empty() {
        vec![
            String::new(),
            "posts".into(),
            "posts/show?id=1".into(),
            "posts/create?title=Draft".into(),
            "posts/create?title=Routing&token=letmein".into(),
            "posts/archive?year=2024".into(),
            "admin.dashboard".into(),
            "home/about".into(),
            "health?probe=1".into(),
            "nowhere".into(),
        ]
    } else {
        args.paths
    };

    for line in paths {
        let (path, request) = parse_request(&line);
        let route = route_for(&path);
        let reply = app.handle_or_render(request, route).await;
        println!(
            "/{path:<40} {} {}",
            reply.status(),
            serde_json::to_string(reply.body())?
        );
    }

    Ok(())
}
