//! Switchyard Runtime - the application layer around the dispatcher.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`) and validation
//! - Logging configuration (`LoggingBuilder`)
//! - The [`App`] kernel, which runs the `global` middleware scope around
//!   every dispatch and renders dispatch errors
//!
//! ```ignore
//! use switchyard_runtime::{App, ConfigLoader, logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     logging::init_from_config(&config.logging);
//!
//!     let app = App::builder(config)
//!         .controller_default::<Index>("app.controller.Index")
//!         .middleware("timing", Timing)
//!         .build()?;
//!
//!     let reply = app.handle_or_render(Request::get("/"), RouteMatch::path("/")).await;
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `toml-config` (default): TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log lines

pub mod app;
pub mod config;
pub mod error;
pub mod logging;

// Re-exports
pub use app::{App, AppBuilder, render_error};
pub use config::{AppConfig, ConfigError, ConfigLoader, ConfigResult, LoggingConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
