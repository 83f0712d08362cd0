//! Middleware discovery.

use tracing::trace;

use super::MiddlewareSpec;
use crate::controller::DeclaresMiddleware;

/// Expands a handler's declared middleware into the ordered list that applies
/// to `action`.
///
/// Declaration order is kept exactly; it becomes the pipeline nesting order
/// (first declared = outermost).
pub fn discover<H>(handler: &H, action: &str) -> Vec<MiddlewareSpec>
where
    H: DeclaresMiddleware + ?Sized,
{
    handler
        .middleware()
        .into_iter()
        .filter(|spec| {
            let applies = spec.applies_to(action);
            trace!(middleware = spec.name(), action, applies, "filtered middleware");
            applies
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    struct Posts;

    impl DeclaresMiddleware for Posts {
        fn middleware(&self) -> Vec<MiddlewareSpec> {
            vec![
                MiddlewareSpec::new("log"),
                MiddlewareSpec::new("auth").only(["edit", "delete"]),
                MiddlewareSpec::new("cache:300").except("edit"),
            ]
        }
    }

    struct Plain;

    impl DeclaresMiddleware for Plain {}

    fn names(specs: &[MiddlewareSpec]) -> Vec<&str> {
        specs.iter().map(MiddlewareSpec::name).collect()
    }

    #[test]
    fn test_discover_filters_and_keeps_order() {
        assert_eq!(names(&discover(&Posts, "edit")), ["log", "auth"]);
        assert_eq!(names(&discover(&Posts, "delete")), ["log", "auth", "cache"]);
        assert_eq!(names(&discover(&Posts, "list")), ["log", "cache"]);
        assert_eq!(names(&discover(&Posts, "EDIT")), ["log", "auth"]);
    }

    #[test]
    fn test_discover_without_declarations() {
        assert!(discover(&Plain, "index").is_empty());
    }

    proptest! {
        #[test]
        fn prop_only_registers_for_members(action in "[a-z]{1,8}") {
            let spec = MiddlewareSpec::new("auth").only(["edit", "delete"]);
            let member = action == "edit" || action == "delete";
            prop_assert_eq!(spec.applies_to(&action), member);
            prop_assert_eq!(spec.applies_to(&action.to_uppercase()), member);
        }

        #[test]
        fn prop_except_skips_members(action in "[a-z]{1,8}") {
            let spec = MiddlewareSpec::new("auth").except(["edit"]);
            prop_assert_eq!(spec.applies_to(&action), action != "edit");
        }
    }
}
