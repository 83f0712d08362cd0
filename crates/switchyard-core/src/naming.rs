//! Controller naming conventions.

use crate::config::DispatchConfig;

/// Upper-cases the first character, leaving the rest untouched.
fn title_case(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Normalises a controller name.
///
/// Dotted names keep their prefix verbatim and title-case only the last
/// segment (`admin.user` → `admin.User`); plain names are title-cased
/// (`user` → `User`).
pub fn controller_name(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((prefix, last)) => format!("{prefix}.{}", title_case(last)),
        None => title_case(name),
    }
}

/// Checks a URL-derived controller candidate against `^[A-Za-z0-9][A-Za-z0-9_.]*$`.
pub fn is_valid_controller(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        }
        _ => false,
    }
}

/// Builds the fully-qualified class name for a (normalised) controller name:
/// `<namespace>.<layer>.<Name>[<suffix>]`.
pub fn class_name(config: &DispatchConfig, controller: &str) -> String {
    let mut class = String::with_capacity(
        config.namespace.len() + config.controller_layer.len() + controller.len() + 16,
    );
    for part in [config.namespace.as_str(), config.controller_layer.as_str()] {
        if !part.is_empty() {
            class.push_str(part);
            class.push('.');
        }
    }
    class.push_str(controller);
    if config.controller_suffix {
        class.push_str(&config.suffix);
    }
    class
}
