//! Explicit registry of per-integration coordinator instances.

use crate::core::Coordinator;
use crate::error::{CoordinatorError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Keyed store of coordinator instances, owned by the runtime.
///
/// One entry per integration instance, inserted at setup and removed at
/// unload. The registry is passed by reference to whichever subsystem needs
/// lookup — it is never an ambient global. Entries are type-erased so
/// coordinators over different snapshot types share one registry; retrieval
/// is typed and returns `None` on a type mismatch.
///
/// # Examples
///
/// ```rust,no_run
/// use pollcast::prelude::*;
/// use pollcast::registry::InstanceRegistry;
///
/// # async fn example(coordinator: Coordinator<u32>) -> Result<()> {
/// let registry = InstanceRegistry::new();
///
/// // Integration setup:
/// registry.insert("braviatv:living-room", coordinator)?;
///
/// // Integration unload:
/// if let Some(coordinator) = registry.remove::<u32>("braviatv:living-room") {
///     coordinator.shutdown();
/// }
/// # Ok(())
/// # }
/// ```
pub struct InstanceRegistry {
    entries: Mutex<HashMap<String, Arc<dyn Any + Send + Sync>>>,
}

impl InstanceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a coordinator under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::DuplicateInstance`] if the key is taken;
    /// setup of the same instance twice is a bug in the caller, not a
    /// replacement.
    pub fn insert<T: Send + Sync + 'static>(
        &self,
        key: impl Into<String>,
        coordinator: Coordinator<T>,
    ) -> Result<()> {
        let key = key.into();
        let mut entries = self.lock_entries();
        if entries.contains_key(&key) {
            return Err(CoordinatorError::DuplicateInstance(key));
        }
        entries.insert(key, Arc::new(coordinator));
        Ok(())
    }

    /// Look up a coordinator by key.
    ///
    /// Returns `None` when the key is absent or was registered with a
    /// different snapshot type.
    pub fn get<T: Send + Sync + 'static>(&self, key: &str) -> Option<Coordinator<T>> {
        let entries = self.lock_entries();
        entries
            .get(key)
            .and_then(|entry| entry.downcast_ref::<Coordinator<T>>())
            .cloned()
    }

    /// Remove and return the coordinator under `key` so the caller can shut
    /// it down.
    ///
    /// Removing an absent key is a no-op returning `None`. A present entry
    /// of a different snapshot type is left in place.
    pub fn remove<T: Send + Sync + 'static>(&self, key: &str) -> Option<Coordinator<T>> {
        let mut entries = self.lock_entries();
        let matches = entries
            .get(key)
            .is_some_and(|entry| entry.is::<Coordinator<T>>());
        if !matches {
            return None;
        }
        entries
            .remove(key)
            .and_then(|entry| entry.downcast_ref::<Coordinator<T>>().cloned())
    }

    /// Whether an instance is registered under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.lock_entries().contains_key(key)
    }

    /// Keys of all registered instances.
    pub fn keys(&self) -> Vec<String> {
        self.lock_entries().keys().cloned().collect()
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    fn lock_entries(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, Arc<dyn Any + Send + Sync>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coordinator(name: &str) -> Coordinator<u32> {
        Coordinator::builder()
            .with_name(name)
            .with_fetch_fn(|| async { Ok(0_u32) })
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn insert_and_get() {
        let registry = InstanceRegistry::new();
        registry.insert("a", coordinator("a")).unwrap();

        let found = registry.get::<u32>("a").unwrap();
        assert_eq!(found.name(), "a");
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_insert_fails() {
        let registry = InstanceRegistry::new();
        registry.insert("a", coordinator("a")).unwrap();

        let err = registry.insert("a", coordinator("a2"));
        assert!(matches!(err, Err(CoordinatorError::DuplicateInstance(_))));
        // The original entry is untouched.
        assert_eq!(registry.get::<u32>("a").unwrap().name(), "a");
    }

    #[tokio::test]
    async fn remove_returns_instance() {
        let registry = InstanceRegistry::new();
        registry.insert("a", coordinator("a")).unwrap();

        let removed = registry.remove::<u32>("a").unwrap();
        assert_eq!(removed.name(), "a");
        assert!(registry.get::<u32>("a").is_none());
        assert!(registry.remove::<u32>("a").is_none());
    }

    #[tokio::test]
    async fn typed_lookup_rejects_wrong_type() {
        let registry = InstanceRegistry::new();
        registry.insert("a", coordinator("a")).unwrap();

        assert!(registry.get::<String>("a").is_none());
        // A mistyped remove leaves the entry alone.
        assert!(registry.remove::<String>("a").is_none());
        assert!(registry.contains("a"));
    }

    #[tokio::test]
    async fn keys_lists_instances() {
        let registry = InstanceRegistry::new();
        registry.insert("a", coordinator("a")).unwrap();
        registry.insert("b", coordinator("b")).unwrap();

        let mut keys = registry.keys();
        keys.sort();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }
}
