//! # Switchyard
//!
//! Turns a matched route into a running handler under middleware control.
//!
//! ## Overview
//!
//! A transport's route matcher hands Switchyard a [`RouteMatch`]: an
//! invocable callback, an explicit controller/action pair, or a raw path.
//! Switchyard resolves it into a dispatch target, instantiates the controller
//! from an explicit registry, discovers the controller's declared middleware
//! and runs the action inside an onion pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────────┐   ┌────────────┐   ┌─────────────────────┐   ┌────────┐
//! │ Transport │──▶│ global pipeline  │──▶│ Dispatcher │──▶│ controller pipeline │──▶│ action │
//! │ (matcher) │   │ (App, optional)  │   │            │   │ (declared per ctrl) │   │        │
//! └───────────┘   └──────────────────┘   └────────────┘   └─────────────────────┘   └────────┘
//! ```
//!
//! - **Core**: request context, replies, dispatch targets and errors
//! - **Framework**: controller registry, middleware, pipeline and binder
//! - **Macros**: `#[controller]` generates the action registry of an `impl`
//! - **Runtime**: configuration, logging and the [`App`](runtime::App) kernel
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use switchyard::prelude::*;
//!
//! #[derive(Default)]
//! struct Index;
//!
//! #[controller]
//! impl Index {
//!     fn index(&self) -> &'static str {
//!         "hello"
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let app = App::builder(AppConfig::default())
//!         .controller_default::<Index>("app.controller.Index")
//!         .build()?;
//!
//!     let reply = app.handle(Request::get("/"), RouteMatch::path("/")).await?;
//!     assert_eq!(reply.body(), "hello");
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output
//!
//! [`RouteMatch`]: switchyard_core::RouteMatch

pub use switchyard_core as core;
pub use switchyard_framework as framework;
pub use switchyard_macros::controller;
pub use switchyard_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use switchyard::prelude::*;
/// ```
pub mod prelude {
    // Application kernel
    pub use switchyard_runtime::{App, AppConfig, ConfigLoader, LoggingBuilder};

    // Controllers
    pub use switchyard_framework::{Controller, DeclaresMiddleware, Services};
    pub use switchyard_macros::controller;

    // Middleware
    pub use switchyard_framework::{Middleware, MiddlewareSpec, Next, middleware_fn};
    pub use switchyard_framework::prelude::async_trait;

    // Request and reply types
    pub use switchyard_core::{
        DispatchConfig, DispatchError, DispatchResult, IntoReply, Json, Params, Reply, Request,
        RouteMatch,
    };
}
