//! Middleware registry.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use super::{Middleware, MiddlewareSpec};
use crate::pipeline::Stage;
use switchyard_core::{DispatchError, DispatchResult};

/// Maps middleware identifiers to implementations.
///
/// Populated at startup; read-only while requests are dispatched.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    entries: HashMap<String, Arc<dyn Middleware>>,
}

impl MiddlewareRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `middleware` under `name`, replacing any previous entry.
    pub fn register<M: Middleware>(&mut self, name: impl Into<String>, middleware: M) {
        self.register_arc(name, Arc::new(middleware));
    }

    /// Registers a shared middleware instance.
    pub fn register_arc(&mut self, name: impl Into<String>, middleware: Arc<dyn Middleware>) {
        let name = name.into();
        debug!(middleware = %name, "Registered middleware");
        self.entries.insert(name, middleware);
    }

    /// Looks up a middleware by name.
    pub fn get(&self, name: &str) -> DispatchResult<Arc<dyn Middleware>> {
        self.entries
            .get(name)
            .cloned()
            .ok_or_else(|| DispatchError::MiddlewareNotFound {
                name: name.to_string(),
            })
    }

    /// Returns `true` if `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Number of registered middleware.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds pipeline stages for `specs`, preserving their order.
    ///
    /// Fails on the first unknown identifier.
    pub fn stages(&self, specs: &[MiddlewareSpec]) -> DispatchResult<Vec<Stage>> {
        specs
            .iter()
            .map(|spec| {
                let middleware = self.get(spec.name())?;
                Ok(Stage::new(spec.name(), middleware, spec.parameters().to_vec()))
            })
            .collect()
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("MiddlewareRegistry")
            .field("entries", &names)
            .finish()
    }
}
