//! Service container handed to controller factories.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ServiceMissing;

type ServiceArc = Arc<dyn Any + Send + Sync>;

/// Shared services keyed by type.
///
/// Services are stored as `Arc<T>` and may be trait objects:
///
/// ```rust,ignore
/// let mut services = Services::new();
/// services.provide::<dyn PostStore>(Arc::new(MemoryStore::default()));
///
/// let store: Arc<dyn PostStore> = services.require::<dyn PostStore>()?;
/// ```
#[derive(Clone, Default)]
pub struct Services {
    entries: HashMap<TypeId, (&'static str, ServiceArc)>,
}

impl Services {
    /// Creates an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a concrete service value.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) {
        self.provide::<T>(Arc::new(value));
    }

    /// Stores an already shared service, replacing any previous `T`.
    pub fn provide<T: ?Sized + Send + Sync + 'static>(&mut self, service: Arc<T>) {
        self.entries.insert(
            TypeId::of::<T>(),
            (std::any::type_name::<T>(), Arc::new(service)),
        );
    }

    /// Looks up a service.
    pub fn get<T: ?Sized + 'static>(&self) -> Option<Arc<T>> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|(_, arc)| arc.downcast_ref::<Arc<T>>().map(Arc::clone))
    }

    /// Looks up a service that must be present.
    pub fn require<T: ?Sized + 'static>(&self) -> Result<Arc<T>, ServiceMissing> {
        self.get::<T>().ok_or_else(ServiceMissing::of::<T>)
    }

    /// Returns `true` if a `T` is stored.
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Number of stored services.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the container is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.entries.values().map(|(name, _)| *name).collect();
        names.sort_unstable();
        f.debug_struct("Services").field("entries", &names).finish()
    }
}
