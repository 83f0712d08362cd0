//! Procedural macros for Switchyard controllers.
//!
//! This crate provides:
//!
//! - `#[controller]` - Implements `Controller` and `DeclaresMiddleware` for
//!   an inherent `impl` block
//!
//! ```rust,ignore
//! use switchyard::prelude::*;
//!
//! #[derive(Default)]
//! pub struct Post;
//!
//! #[controller]
//! impl Post {
//!     #[middleware]
//!     fn declared(&self) -> Vec<MiddlewareSpec> {
//!         vec![MiddlewareSpec::new("auth").only("edit")]
//!     }
//!
//!     async fn show(&self, id: u64) -> String {
//!         format!("post {id}")
//!     }
//!
//!     fn edit(&self, request: &Request, id: u64) -> Reply {
//!         Reply::text(format!("{} edits {id}", request.path()))
//!     }
//!
//!     #[fallback]
//!     fn missing(&self, action: String, params: Params) -> String {
//!         format!("no action {action} ({} params)", params.len())
//!     }
//! }
//! ```

mod controller;

use proc_macro::TokenStream;
use syn::{ItemImpl, parse_macro_input};

/// Turns the methods of an inherent `impl` block into controller actions.
///
/// Every method with a `self` receiver becomes an action named after the
/// method. Arguments are bound from the parameter bag by their names; an
/// argument typed `&Request` receives the current request instead.
/// Associated functions without a receiver are left alone. Methods may be
/// `async` or synchronous and may return anything implementing `IntoReply`.
///
/// # Method attributes
///
/// - `#[fallback]` - The catch-all action; takes exactly two arguments, the
///   requested action name and the full parameter bag
/// - `#[middleware]` - A `fn(&self) -> Vec<MiddlewareSpec>` supplying the
///   controller's middleware declarations
/// - `#[skip]` - Not an action
///
/// # Arguments
///
/// - `crate = path` - Path of the framework crate (default
///   `::switchyard::framework`); crates depending on `switchyard-framework`
///   directly pass `crate = ::switchyard_framework`
#[proc_macro_attribute]
pub fn controller(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args as controller::ControllerArgs);
    let item = parse_macro_input!(input as ItemImpl);

    match controller::expand(args, item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
