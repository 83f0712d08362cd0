//! Dispatch configuration.
//!
//! [`DispatchConfig`] is immutable once built and is passed explicitly to the
//! resolver and dispatcher. The runtime crate loads it as the `[dispatch]`
//! section of the application configuration.

use serde::{Deserialize, Serialize};

/// Naming and defaulting rules used while resolving a dispatch target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Controller used when the route names none.
    #[serde(default = "default_controller")]
    pub default_controller: String,

    /// Action used when the route names none.
    #[serde(default = "default_action")]
    pub default_action: String,

    /// Append [`suffix`](Self::suffix) to controller class names.
    #[serde(default)]
    pub controller_suffix: bool,

    /// Class-name suffix applied when `controller_suffix` is on.
    #[serde(default = "default_suffix")]
    pub suffix: String,

    /// Controller resolved when the requested one does not exist.
    #[serde(default = "default_empty_controller")]
    pub empty_controller: String,

    /// Root namespace of controller classes.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Layer segment between the namespace and the controller name.
    #[serde(default = "default_controller_layer")]
    pub controller_layer: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_controller: default_controller(),
            default_action: default_action(),
            controller_suffix: false,
            suffix: default_suffix(),
            empty_controller: default_empty_controller(),
            namespace: default_namespace(),
            controller_layer: default_controller_layer(),
        }
    }
}

impl DispatchConfig {
    /// Sets the default controller (builder pattern).
    pub fn default_controller(mut self, name: impl Into<String>) -> Self {
        self.default_controller = name.into();
        self
    }

    /// Sets the default action (builder pattern).
    pub fn default_action(mut self, name: impl Into<String>) -> Self {
        self.default_action = name.into();
        self
    }

    /// Enables or disables the class-name suffix (builder pattern).
    pub fn controller_suffix(mut self, enabled: bool) -> Self {
        self.controller_suffix = enabled;
        self
    }

    /// Sets the empty controller (builder pattern).
    pub fn empty_controller(mut self, name: impl Into<String>) -> Self {
        self.empty_controller = name.into();
        self
    }

    /// Sets the root namespace (builder pattern).
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }
}

fn default_controller() -> String {
    "Index".to_string()
}

fn default_action() -> String {
    "index".to_string()
}

fn default_suffix() -> String {
    "Controller".to_string()
}

fn default_empty_controller() -> String {
    "Error".to_string()
}

fn default_namespace() -> String {
    "app".to_string()
}

fn default_controller_layer() -> String {
    "controller".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: DispatchConfig =
            serde_json::from_str(r#"{ "default_controller": "Home", "controller_suffix": true }"#)
                .unwrap();
        assert_eq!(config.default_controller, "Home");
        assert_eq!(config.default_action, "index");
        assert!(config.controller_suffix);
        assert_eq!(config.suffix, "Controller");
    }
}
