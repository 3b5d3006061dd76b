//! Listener registration and fan-out for snapshot changes.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, Weak};
use tracing::warn;

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Internal listener registry state.
struct RegistryInner {
    listeners: Vec<(u64, Listener)>,
    next_id: u64,
}

/// Handle for a registered listener.
///
/// Dropping the handle deregisters the listener. Removal is idempotent:
/// clearing the registry first, or detaching twice through an owning entity,
/// is a no-op.
pub struct ListenerHandle {
    id: u64,
    // Weak so an orphaned handle does not keep a shut-down registry alive.
    registry: Weak<Mutex<RegistryInner>>,
}

impl ListenerHandle {
    /// Deregister the listener now instead of at drop time.
    pub fn remove(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut inner = registry.lock().unwrap_or_else(|e| e.into_inner());
            inner.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

/// Registry of no-argument callbacks notified after each successful refresh.
///
/// Delivery is in registration order. The listener list is cloned before a
/// notification round begins, so a listener added from within another
/// listener joins the next round, and one removed mid-round still receives
/// the current round's delivery.
///
/// # Examples
///
/// ```rust
/// use pollcast::notify::ListenerRegistry;
///
/// let registry = ListenerRegistry::new();
/// let handle = registry.add(|| println!("snapshot changed"));
///
/// registry.notify_all();
///
/// // Deregister by dropping the handle.
/// drop(handle);
/// ```
pub struct ListenerRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryInner {
                listeners: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Register a listener; returns the deregistration handle.
    pub fn add<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(callback)));

        ListenerHandle {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Invoke every currently registered listener, in registration order.
    ///
    /// A panicking listener is caught and logged; the remaining listeners in
    /// the round still run.
    pub fn notify_all(&self) {
        let scheduled: Vec<(u64, Listener)> = {
            let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.listeners.clone()
        };

        for (id, listener) in scheduled {
            if catch_unwind(AssertUnwindSafe(|| listener())).is_err() {
                warn!(listener = id, "listener panicked during notification");
            }
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.listeners.len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all listeners. Outstanding handles become no-ops.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.listeners.clear();
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for ListenerRegistry {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
