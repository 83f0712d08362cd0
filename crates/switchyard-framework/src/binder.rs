//! Action selection and invocation.

use tracing::{debug, trace};

use crate::controller::{Arguments, Controller, FALLBACK_ACTION};
use switchyard_core::{DispatchError, DispatchResult, Params, Reply, Request};

/// Which controller action a request ends up calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodTarget {
    /// A declared action.
    Action(&'static str),
    /// The fallback action, carrying the action that was asked for.
    Fallback {
        /// The originally requested action name.
        requested: String,
    },
}

/// Picks the action for `action` on `controller`.
///
/// Action names match case-insensitively. When nothing matches, the
/// controller's fallback is chosen if it has one; otherwise the result is
/// [`DispatchError::MethodNotFound`] naming `class`.
pub fn select_method(
    controller: &dyn Controller,
    class: &str,
    action: &str,
) -> DispatchResult<MethodTarget> {
    let found = controller
        .actions()
        .iter()
        .copied()
        .filter(|name| *name != FALLBACK_ACTION)
        .find(|name| name.eq_ignore_ascii_case(action));

    match found {
        Some(name) => Ok(MethodTarget::Action(name)),
        None if controller.has_fallback() => Ok(MethodTarget::Fallback {
            requested: action.to_string(),
        }),
        None => Err(DispatchError::method_not_found(class, action)),
    }
}

/// Calls `action` on `controller` with the final parameter bag.
///
/// A fallback receives exactly two arguments: the requested action name
/// and the bag.
pub async fn invoke(
    controller: &dyn Controller,
    class: &str,
    action: &str,
    request: &Request,
    params: Params,
) -> DispatchResult<Reply> {
    match select_method(controller, class, action)? {
        MethodTarget::Action(name) => {
            trace!(class, action = name, "invoking action");
            controller.call(name, request, Arguments::Named(params)).await
        }
        MethodTarget::Fallback { requested } => {
            debug!(class, action = %requested, "Invoking fallback action");
            let args = Arguments::Fallback {
                action: requested,
                params,
            };
            controller.call(FALLBACK_ACTION, request, args).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::DeclaresMiddleware;
    use futures::future::BoxFuture;
    use serde_json::json;

    struct Posts {
        fallback: bool,
    }

    impl DeclaresMiddleware for Posts {}

    impl Controller for Posts {
        fn actions(&self) -> &'static [&'static str] {
            if self.fallback {
                &["show", "listAll", FALLBACK_ACTION]
            } else {
                &["show", "listAll"]
            }
        }

        fn call<'a>(
            &'a self,
            action: &'a str,
            _request: &'a Request,
            args: Arguments,
        ) -> BoxFuture<'a, DispatchResult<Reply>> {
            Box::pin(async move {
                match action {
                    "show" => Ok(Reply::new(json!({ "id": args.bind::<u64>("id")? }))),
                    "listAll" => Ok(Reply::text("all")),
                    FALLBACK_ACTION => {
                        let (requested, params) = args.into_fallback()?;
                        Ok(Reply::new(json!({ "requested": requested, "count": params.len() })))
                    }
                    _ => Err(DispatchError::method_not_found("Posts", action)),
                }
            })
        }
    }

    fn bag(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_select_case_insensitive() {
        let posts = Posts { fallback: false };
        assert_eq!(
            select_method(&posts, "app.controller.Posts", "listall").unwrap(),
            MethodTarget::Action("listAll")
        );
        assert_eq!(
            select_method(&posts, "app.controller.Posts", "SHOW").unwrap(),
            MethodTarget::Action("show")
        );
    }

    #[test]
    fn test_select_missing_action() {
        let posts = Posts { fallback: false };
        let err = select_method(&posts, "app.controller.Posts", "archive").unwrap_err();
        assert_eq!(
            err.to_string(),
            "method not exists: app.controller.Posts->archive()"
        );
    }

    #[test]
    fn test_fallback_name_not_directly_callable() {
        let posts = Posts { fallback: false };
        assert!(select_method(&posts, "Posts", FALLBACK_ACTION).is_err());
    }

    #[tokio::test]
    async fn test_invoke_binds_by_name() {
        let posts = Posts { fallback: false };
        let reply = invoke(&posts, "Posts", "show", &Request::get("/"), bag(json!({ "id": 9 })))
            .await
            .unwrap();
        assert_eq!(reply.body(), &json!({ "id": 9 }));
    }

    #[tokio::test]
    async fn test_invoke_fallback_receives_two_arguments() {
        let posts = Posts { fallback: true };
        let reply = invoke(
            &posts,
            "Posts",
            "archive",
            &Request::get("/"),
            bag(json!({ "year": 2024, "month": 5 })),
        )
        .await
        .unwrap();
        assert_eq!(reply.body(), &json!({ "requested": "archive", "count": 2 }));
    }
}
