//! Controller resolution.
//!
//! Controllers are registered up front under their fully-qualified class
//! name together with a factory. Resolving a controller name:
//!
//! 1. build the class name from the configured namespace, layer and suffix
//!    (cached per controller name once the class is known to be registered)
//! 2. if the class is registered, construct a fresh instance
//! 3. otherwise fall back to the configured empty controller
//! 4. otherwise fail with [`DispatchError::ClassNotFound`] naming the
//!    originally requested class

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::container::Services;
use crate::controller::Controller;
use switchyard_core::{BoxError, DispatchConfig, DispatchError, DispatchResult, naming};

/// Builds a fresh controller instance.
pub type ControllerFactory =
    Arc<dyn Fn(&Services) -> Result<Box<dyn Controller>, BoxError> + Send + Sync>;

// ============================================================================
// ControllerRegistry
// ============================================================================

/// Maps class names to controller factories.
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory for `class`, replacing any previous one.
    pub fn register<F, C>(&mut self, class: impl Into<String>, factory: F)
    where
        F: Fn(&Services) -> Result<C, BoxError> + Send + Sync + 'static,
        C: Controller,
    {
        let class = class.into();
        debug!(class = %class, "Registered controller");
        self.factories.insert(
            class,
            Arc::new(move |services: &Services| -> Result<Box<dyn Controller>, BoxError> {
                Ok(Box::new(factory(services)?))
            }),
        );
    }

    /// Registers a controller built with [`Default`].
    pub fn register_default<C: Controller + Default>(&mut self, class: impl Into<String>) {
        self.register(class, |_: &Services| Ok::<_, BoxError>(C::default()));
    }

    /// Returns the factory for `class`.
    pub fn get(&self, class: &str) -> Option<&ControllerFactory> {
        self.factories.get(class)
    }

    /// Returns `true` if `class` is registered.
    pub fn contains(&self, class: &str) -> bool {
        self.factories.contains_key(class)
    }

    /// Number of registered classes.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl std::fmt::Debug for ControllerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut classes: Vec<_> = self.factories.keys().collect();
        classes.sort();
        f.debug_struct("ControllerRegistry")
            .field("classes", &classes)
            .finish()
    }
}

// ============================================================================
// ControllerResolver
// ============================================================================

/// A freshly constructed controller and the class it was built from.
pub struct ResolvedHandler {
    /// Fully-qualified class name actually constructed.
    pub class: String,
    /// The instance; never shared between dispatches.
    pub instance: Box<dyn Controller>,
}

impl std::fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

/// Turns controller names into handler instances.
pub struct ControllerResolver {
    config: Arc<DispatchConfig>,
    registry: ControllerRegistry,
    services: Services,
    /// Controller name → class name, for registered classes only.
    class_cache: RwLock<HashMap<String, String>>,
}

impl ControllerResolver {
    /// Creates a resolver.
    pub fn new(config: Arc<DispatchConfig>, registry: ControllerRegistry, services: Services) -> Self {
        Self {
            config,
            registry,
            services,
            class_cache: RwLock::new(HashMap::new()),
        }
    }

    /// The dispatch configuration.
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The controller registry.
    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// The service container passed to factories.
    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Fully-qualified class name for a normalised controller name.
    ///
    /// Controller names reach this straight from URLs, so only names that
    /// map to a registered class are cached.
    pub fn class_name(&self, controller: &str) -> String {
        if let Some(class) = self.class_cache.read().get(controller) {
            return class.clone();
        }
        let class = naming::class_name(&self.config, controller);
        if !self.registry.contains(&class) {
            return class;
        }
        self.class_cache
            .write()
            .entry(controller.to_string())
            .or_insert(class)
            .clone()
    }

    /// Resolves `controller` to a new handler instance.
    pub fn resolve(&self, controller: &str) -> DispatchResult<ResolvedHandler> {
        let requested = self.class_name(controller);
        if self.registry.contains(&requested) {
            return self.construct(requested);
        }

        let empty = naming::controller_name(&self.config.empty_controller);
        if !empty.is_empty() {
            let fallback = self.class_name(&empty);
            if self.registry.contains(&fallback) {
                debug!(requested = %requested, fallback = %fallback, "Using empty controller");
                return self.construct(fallback);
            }
        }

        Err(DispatchError::ClassNotFound { requested })
    }

    fn construct(&self, class: String) -> DispatchResult<ResolvedHandler> {
        let factory = self
            .registry
            .get(&class)
            .ok_or_else(|| DispatchError::ClassNotFound {
                requested: class.clone(),
            })?;
        match factory(&self.services) {
            Ok(instance) => Ok(ResolvedHandler { class, instance }),
            Err(source) => Err(DispatchError::Construction { class, source }),
        }
    }
}

impl std::fmt::Debug for ControllerResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerResolver")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("services", &self.services)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Arguments, DeclaresMiddleware};
    use futures::future::BoxFuture;
    use switchyard_core::{Reply, Request};

    #[derive(Default)]
    struct Named(&'static str);

    impl DeclaresMiddleware for Named {}

    impl Controller for Named {
        fn actions(&self) -> &'static [&'static str] {
            &["index"]
        }

        fn call<'a>(
            &'a self,
            _action: &'a str,
            _request: &'a Request,
            _args: Arguments,
        ) -> BoxFuture<'a, DispatchResult<Reply>> {
            Box::pin(async move { Ok(Reply::text(self.0)) })
        }
    }

    fn resolver(config: DispatchConfig) -> ControllerResolver {
        let mut registry = ControllerRegistry::new();
        registry.register("app.controller.User", |_: &Services| {
            Ok::<_, BoxError>(Named("user"))
        });
        registry.register("app.controller.admin.Post", |_: &Services| {
            Ok::<_, BoxError>(Named("post"))
        });
        registry.register("app.controller.Broken", |_: &Services| {
            Err::<Named, BoxError>("database offline".into())
        });
        ControllerResolver::new(Arc::new(config), registry, Services::new())
    }

    #[test]
    fn test_class_name_cached() {
        let plain = resolver(DispatchConfig::default());
        assert_eq!(plain.class_name("User"), "app.controller.User");
        assert_eq!(plain.class_name("User"), "app.controller.User");
        assert_eq!(plain.class_cache.read().len(), 1);

        let suffixed = resolver(DispatchConfig::default().controller_suffix(true));
        assert_eq!(suffixed.class_name("User"), "app.controller.UserController");
    }

    #[test]
    fn test_unknown_names_not_cached() {
        let resolver = resolver(DispatchConfig::default());
        for i in 0..10_000 {
            assert!(resolver.resolve(&format!("Ghost{i}")).is_err());
        }
        assert!(resolver.class_cache.read().is_empty());

        resolver.resolve("User").unwrap();
        assert_eq!(resolver.class_cache.read().len(), 1);
        assert_eq!(resolver.class_name("Ghost0"), "app.controller.Ghost0");
        assert_eq!(resolver.class_cache.read().len(), 1);
    }

    #[test]
    fn test_resolve_twice_same_class_distinct_instances() {
        let resolver = resolver(DispatchConfig::default());
        let first = resolver.resolve("User").unwrap();
        let second = resolver.resolve("User").unwrap();
        assert_eq!(first.class, second.class);
        assert!(!std::ptr::addr_eq(&*first.instance, &*second.instance));
    }

    #[test]
    fn test_resolve_registered() {
        let resolver = resolver(DispatchConfig::default());
        assert_eq!(resolver.resolve("User").unwrap().class, "app.controller.User");
        assert_eq!(
            resolver.resolve("admin.Post").unwrap().class,
            "app.controller.admin.Post"
        );
    }

    #[test]
    fn test_resolve_missing_without_empty_controller() {
        let resolver = resolver(DispatchConfig::default());
        let err = resolver.resolve("Missing").unwrap_err();
        assert!(
            matches!(err, DispatchError::ClassNotFound { requested } if requested == "app.controller.Missing")
        );
    }

    #[test]
    fn test_resolve_falls_back_to_empty_controller() {
        let resolver = resolver(DispatchConfig::default().empty_controller("user"));
        assert_eq!(resolver.resolve("Missing").unwrap().class, "app.controller.User");
    }

    #[test]
    fn test_factory_error_propagates() {
        let resolver = resolver(DispatchConfig::default());
        let err = resolver.resolve("Broken").unwrap_err();
        match err {
            DispatchError::Construction { ref class, ref source } => {
                assert_eq!(class, "app.controller.Broken");
                assert_eq!(source.to_string(), "database offline");
                assert_eq!(err.to_string(), "database offline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
