//! # Switchyard Core
//!
//! Foundation types for the Switchyard dispatch layer:
//!
//! - **Request context**: the per-request parameter bag, resolved
//!   controller/action names and typed extensions ([`Request`])
//! - **Replies**: the value a dispatch resolves to ([`Reply`], [`IntoReply`])
//! - **Dispatch targets**: route-matcher output and its resolution into a
//!   callback, a controller action, or a URL-derived controller action
//!   ([`RouteMatch`], [`DispatchTarget`])
//! - **Configuration**: defaulting and naming rules ([`DispatchConfig`])
//! - **Errors**: the dispatch error taxonomy ([`DispatchError`])
//!
//! Resolution of controllers, middleware and the pipeline itself live in
//! `switchyard-framework`.
//!
//! ```text
//! RouteMatch ──resolve──▶ DispatchTarget ─┬─ Callback ───────────────▶ Reply
//!                                         ├─ Controller ─┐
//!                                         └─ UrlDerived ─┴─▶ framework ──▶ Reply
//! ```

pub mod config;
pub mod error;
pub mod naming;
pub mod reply;
pub mod request;
pub mod target;

pub use config::DispatchConfig;
pub use error::{BoxError, DispatchError, DispatchResult, RoutingError};
pub use reply::{IntoReply, Json, Reply};
pub use request::{Params, Request};
pub use target::{
    BoxedCallback, Callback, ControllerAction, DispatchTarget, ReservedRoutes, RouteMatch,
    RouteTarget,
};

/// Prelude for common imports.
pub mod prelude {
    pub use super::{
        DispatchConfig, DispatchError, DispatchResult, IntoReply, Json, Params, Reply, Request,
        RouteMatch,
    };
}
