//! Request context seen by the dispatch layer.
//!
//! A [`Request`] is created by the transport, handed to the dispatcher and
//! threaded by value through every middleware stage down to the handler. The
//! dispatch layer writes to it at two points only: when the controller/action
//! pair is resolved, and when middleware augments it through extensions.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use serde_json::Value;

/// The parameter bag type: an ordered `name → value` map.
pub type Params = serde_json::Map<String, Value>;

/// The inbound request as far as dispatching is concerned.
pub struct Request {
    method: String,
    path: String,
    /// Query and body parameters.
    input: Params,
    /// Named path parameters from the route matcher.
    route: Params,
    controller: Option<String>,
    action: Option<String>,
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Request {
    /// Creates a request for `method path` with empty parameter bags.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            input: Params::new(),
            route: Params::new(),
            controller: None,
            action: None,
            extensions: HashMap::new(),
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    /// Adds a query/body parameter (builder pattern).
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.input.insert(name.into(), value.into());
        self
    }

    /// Adds a named path parameter (builder pattern).
    pub fn with_route_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.route.insert(name.into(), value.into());
        self
    }

    /// Returns the request method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Returns the request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the merged parameter bag.
    ///
    /// Query/body parameters come first; named path parameters override them
    /// on key collision.
    pub fn params(&self) -> Params {
        let mut merged = self.input.clone();
        for (key, value) in &self.route {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Looks up a single parameter, path parameters first.
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.route.get(name).or_else(|| self.input.get(name))
    }

    /// Sets a query/body parameter.
    pub fn set_param(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.input.insert(name.into(), value.into());
    }

    /// Merges named path parameters produced by the route matcher.
    pub fn merge_route_params(&mut self, params: Params) {
        self.route.extend(params);
    }

    /// Records the resolved controller name.
    pub fn set_controller(&mut self, name: impl Into<String>) {
        self.controller = Some(name.into());
    }

    /// Records the resolved action name.
    pub fn set_action(&mut self, name: impl Into<String>) {
        self.action = Some(name.into());
    }

    /// The resolved controller name, once dispatch has begun.
    pub fn controller(&self) -> Option<&str> {
        self.controller.as_deref()
    }

    /// The resolved action name, exactly as recorded.
    pub fn raw_action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// The resolved action name, lower-cased.
    pub fn action(&self) -> Option<String> {
        self.action.as_deref().map(str::to_lowercase)
    }

    /// Stores a typed value for later stages. One value per type.
    pub fn insert_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Returns a previously stored typed value.
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    /// Removes and returns a previously stored typed value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("controller", &self.controller)
            .field("action", &self.action)
            .field("extensions", &self.extensions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_route_params_override_input() {
        let mut req = Request::get("/user/1")
            .with_param("id", 99)
            .with_param("page", 2);
        req.merge_route_params(
            [("id".to_string(), json!(1))]
                .into_iter()
                .collect::<Params>(),
        );

        let params = req.params();
        assert_eq!(params["id"], json!(1));
        assert_eq!(params["page"], json!(2));
        assert_eq!(req.param("id"), Some(&json!(1)));
    }

    #[test]
    fn test_action_case() {
        let mut req = Request::get("/");
        assert!(req.action().is_none());
        req.set_action("ShowProfile");
        assert_eq!(req.raw_action(), Some("ShowProfile"));
        assert_eq!(req.action().as_deref(), Some("showprofile"));
    }

    #[test]
    fn test_extensions() {
        #[derive(Debug, PartialEq)]
        struct UserId(u64);

        let mut req = Request::get("/");
        req.insert_extension(UserId(7));
        assert_eq!(req.extension::<UserId>(), Some(&UserId(7)));
        assert_eq!(req.remove_extension::<UserId>(), Some(UserId(7)));
        assert!(req.extension::<UserId>().is_none());
    }
}
