//! Middleware declarations.

use std::collections::BTreeSet;

use serde_json::Value;

/// Separator between a middleware name and its static parameters in an
/// identifier such as `"throttle:60:1"`.
pub const PARAM_SEPARATOR: char = ':';

/// A single middleware declaration made by a controller.
///
/// The identifier names a middleware registered with the dispatcher;
/// `parameters` are handed to it on every call. `only`/`except` restrict the
/// actions the declaration applies to.
///
/// ```rust,ignore
/// vec![
///     MiddlewareSpec::new("auth").except("login,register"),
///     MiddlewareSpec::new("throttle:60").only(["edit", "delete"]),
///     MiddlewareSpec::new("audit").param("orders"),
/// ]
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MiddlewareSpec {
    name: String,
    parameters: Vec<Value>,
    only: Option<BTreeSet<String>>,
    except: Option<BTreeSet<String>>,
}

impl MiddlewareSpec {
    /// Creates a declaration from an identifier.
    ///
    /// `name:a:b` is split into the name `name` and the static parameters
    /// `["a", "b"]`.
    pub fn new(identifier: impl AsRef<str>) -> Self {
        let mut parts = identifier.as_ref().split(PARAM_SEPARATOR);
        let name = parts.next().unwrap_or_default().trim().to_string();
        let parameters = parts.map(|p| Value::String(p.to_string())).collect();
        Self {
            name,
            parameters,
            only: None,
            except: None,
        }
    }

    /// Alias of [`new`](Self::new) for identifiers read from configuration.
    pub fn parse(identifier: &str) -> Self {
        Self::new(identifier)
    }

    /// Appends an extra parameter (builder pattern).
    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.parameters.push(value.into());
        self
    }

    /// Appends several extra parameters (builder pattern).
    pub fn params<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.parameters.extend(values.into_iter().map(Into::into));
        self
    }

    /// Applies the declaration only to the given actions (builder pattern).
    pub fn only(mut self, actions: impl ActionSet) -> Self {
        self.only = Some(actions.into_action_set());
        self
    }

    /// Applies the declaration to every action except the given ones
    /// (builder pattern).
    pub fn except(mut self, actions: impl ActionSet) -> Self {
        self.except = Some(actions.into_action_set());
        self
    }

    /// The middleware name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static and extra parameters, in declaration order.
    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }

    /// The normalised `only` set, if any.
    pub fn only_actions(&self) -> Option<&BTreeSet<String>> {
        self.only.as_ref()
    }

    /// The normalised `except` set, if any.
    pub fn except_actions(&self) -> Option<&BTreeSet<String>> {
        self.except.as_ref()
    }

    /// Returns `true` if this declaration registers for `action`.
    ///
    /// Both filters are checked independently; failing either skips the
    /// declaration. Matching is case-insensitive.
    pub fn applies_to(&self, action: &str) -> bool {
        let action = action.to_lowercase();
        if let Some(only) = &self.only {
            if !only.contains(&action) {
                return false;
            }
        }
        if let Some(except) = &self.except {
            if except.contains(&action) {
                return false;
            }
        }
        true
    }
}

impl From<&str> for MiddlewareSpec {
    fn from(identifier: &str) -> Self {
        Self::new(identifier)
    }
}

impl From<String> for MiddlewareSpec {
    fn from(identifier: String) -> Self {
        Self::new(identifier)
    }
}

// ============================================================================
// ActionSet
// ============================================================================

/// Values accepted by [`MiddlewareSpec::only`] and [`MiddlewareSpec::except`].
///
/// Strings are split on commas; every entry is trimmed and lower-cased and
/// empty entries are dropped.
pub trait ActionSet {
    /// Normalises `self` into a set of lower-case action names.
    fn into_action_set(self) -> BTreeSet<String>;
}

fn normalize<'a>(items: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    items
        .into_iter()
        .flat_map(|item| item.split(','))
        .map(|action| action.trim().to_lowercase())
        .filter(|action| !action.is_empty())
        .collect()
}

impl ActionSet for &str {
    fn into_action_set(self) -> BTreeSet<String> {
        normalize([self])
    }
}

impl ActionSet for String {
    fn into_action_set(self) -> BTreeSet<String> {
        normalize([self.as_str()])
    }
}

impl ActionSet for &[&str] {
    fn into_action_set(self) -> BTreeSet<String> {
        normalize(self.iter().copied())
    }
}

impl<const N: usize> ActionSet for [&str; N] {
    fn into_action_set(self) -> BTreeSet<String> {
        normalize(self)
    }
}

impl ActionSet for Vec<&str> {
    fn into_action_set(self) -> BTreeSet<String> {
        normalize(self)
    }
}

impl ActionSet for Vec<String> {
    fn into_action_set(self) -> BTreeSet<String> {
        normalize(self.iter().map(String::as_str))
    }
}
