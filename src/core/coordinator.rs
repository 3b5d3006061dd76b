//! The update coordinator: coalesced polling with lock-free snapshot reads.

use crate::core::Fetch;
use crate::error::{CoordinatorError, FetchError, Result};
use crate::notify::{ListenerHandle, ListenerRegistry};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Outcome of a single refresh, shared by every coalesced caller.
type RefreshOutcome = std::result::Result<(), Arc<FetchError>>;

/// Mutable status fields guarded by a short-critical-section lock.
struct Status {
    last_update_success: bool,
    last_updated: Option<DateTime<Utc>>,
    last_error: Option<Arc<FetchError>>,
    consecutive_failures: u32,
}

pub(crate) struct Inner<T> {
    name: String,
    fetcher: Arc<dyn Fetch<T>>,
    failure_threshold: u32,
    /// Current snapshot; absent until the first successful refresh.
    snapshot: ArcSwapOption<T>,
    status: Mutex<Status>,
    listeners: ListenerRegistry,
    /// Sender for the in-flight refresh, if one is running. Joiners
    /// subscribe to it instead of starting a second fetch.
    in_flight: tokio::sync::Mutex<Option<broadcast::Sender<RefreshOutcome>>>,
    shut_down: AtomicBool,
    tick_task: Mutex<Option<JoinHandle<()>>>,
}

/// The update coordinator for one integration instance.
///
/// Owns a single remote fetch operation and a refresh cadence, caches the
/// latest successful result as an immutable snapshot, and notifies
/// registered listeners after every success. Concurrent refresh requests
/// coalesce into the fetch already in flight, so the remote is never hit
/// twice at once.
///
/// The handle is cheap to clone; all clones share the same state.
///
/// # Examples
///
/// ```rust,no_run
/// use pollcast::prelude::*;
/// use std::collections::HashMap;
/// use std::time::Duration;
///
/// # async fn example() -> Result<()> {
/// let coordinator = Coordinator::builder()
///     .with_name("airthings")
///     .with_interval(Duration::from_secs(30))
///     .with_fetch_fn(|| async {
///         let mut data = HashMap::new();
///         data.insert("temp".to_string(), 21.5);
///         Ok(data)
///     })
///     .build()?;
///
/// // Setup-time refresh: failure here means "not ready", retry later.
/// coordinator.refresh_now().await?;
///
/// let snapshot = coordinator.data().expect("first refresh succeeded");
/// println!("temp: {:?}", snapshot.get("temp"));
/// # Ok(())
/// # }
/// ```
pub struct Coordinator<T> {
    inner: Arc<Inner<T>>,
}

impl<T: Send + Sync + 'static> Coordinator<T> {
    pub(crate) fn from_parts(
        name: String,
        fetcher: Arc<dyn Fetch<T>>,
        interval: Option<Duration>,
        failure_threshold: u32,
    ) -> Self {
        let inner = Arc::new(Inner {
            name,
            fetcher,
            failure_threshold,
            snapshot: ArcSwapOption::const_empty(),
            status: Mutex::new(Status {
                last_update_success: false,
                last_updated: None,
                last_error: None,
                consecutive_failures: 0,
            }),
            listeners: ListenerRegistry::new(),
            in_flight: tokio::sync::Mutex::new(None),
            shut_down: AtomicBool::new(false),
            tick_task: Mutex::new(None),
        });

        let coordinator = Self { inner };
        if let Some(interval) = interval {
            coordinator.spawn_tick(interval);
        }
        coordinator
    }

    /// Get the current snapshot, if any.
    ///
    /// Lock-free; returns `None` until the first successful refresh. The
    /// returned `Arc` stays valid even if a refresh replaces the snapshot
    /// while the caller still holds it.
    pub fn data(&self) -> Option<Arc<T>> {
        self.inner.snapshot.load_full()
    }

    /// Whether the most recent refresh attempt succeeded.
    pub fn last_update_success(&self) -> bool {
        self.inner.lock_status().last_update_success
    }

    /// Timestamp of the most recent successful refresh.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.lock_status().last_updated
    }

    /// The failure recorded by the most recent refresh attempt, cleared on
    /// success.
    pub fn last_error(&self) -> Option<Arc<FetchError>> {
        self.inner.lock_status().last_error.clone()
    }

    /// Whether the coordinator is still considered healthy.
    ///
    /// Becomes `false` once the configured number of consecutive fetches
    /// has failed; the owning integration inspects this to decide whether to
    /// mark its entities unavailable. A single success restores readiness.
    pub fn is_ready(&self) -> bool {
        self.inner.lock_status().consecutive_failures < self.inner.failure_threshold
    }

    /// Name used in log output for this coordinator.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Trigger a refresh, coalescing with any fetch already in flight.
    ///
    /// If no fetch is running, one is started on a background task; if one
    /// is, this caller simply joins it. Either way the call resolves with
    /// that single fetch's outcome, so no sequence of concurrent requests
    /// ever runs the fetch function more than once.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::Fetch`] when the (possibly joined) fetch
    /// fails, and [`CoordinatorError::ShutDown`] after [`shutdown`].
    ///
    /// [`shutdown`]: Coordinator::shutdown
    pub async fn request_refresh(&self) -> Result<()> {
        let mut rx = {
            let mut in_flight = self.inner.in_flight.lock().await;
            if self.inner.shut_down.load(Ordering::SeqCst) {
                return Err(CoordinatorError::ShutDown);
            }
            match in_flight.as_ref() {
                Some(tx) => tx.subscribe(),
                None => {
                    let (tx, rx) = broadcast::channel(1);
                    *in_flight = Some(tx.clone());

                    // The fetch runs on its own task so a caller cancelled
                    // mid-await never aborts a fetch other callers joined.
                    let inner = Arc::clone(&self.inner);
                    tokio::spawn(async move {
                        let outcome = inner.run_refresh().await;
                        // Clear the slot before broadcasting so a request
                        // arriving after completion starts a fresh fetch.
                        *inner.in_flight.lock().await = None;
                        let _ = tx.send(outcome);
                    });
                    rx
                }
            }
        };

        match rx.recv().await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(CoordinatorError::Fetch(err)),
            Err(_) => Err(CoordinatorError::Other(
                "refresh task dropped without reporting an outcome".to_string(),
            )),
        }
    }

    /// First refresh at setup time: failure blocks initialization.
    ///
    /// Identical to [`request_refresh`](Coordinator::request_refresh) except
    /// that a fetch failure is surfaced as
    /// [`CoordinatorError::NotReady`], signalling the host runtime to retry
    /// the integration's setup later rather than completing it with no data.
    pub async fn refresh_now(&self) -> Result<()> {
        self.request_refresh().await.map_err(|err| match err {
            CoordinatorError::Fetch(source) => CoordinatorError::NotReady { source },
            other => other,
        })
    }

    /// Publish a snapshot directly, bypassing the fetch function.
    ///
    /// For integrations whose transport pushes state instead of being
    /// polled. Behaves like a successful refresh: the snapshot is replaced
    /// wholesale, the failure counter resets, and listeners are notified.
    pub fn set_data(&self, data: T) {
        self.inner.snapshot.store(Some(Arc::new(data)));
        self.inner.record_success();
        self.inner.listeners.notify_all();
    }

    /// Register a listener invoked after every successful refresh.
    ///
    /// Returns a handle; dropping it (or calling
    /// [`ListenerHandle::remove`]) deregisters the listener. Listeners run
    /// in registration order and must not perform I/O; they read the shared
    /// snapshot via [`data`](Coordinator::data) and derive their own state.
    pub fn add_listener<F>(&self, callback: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.listeners.add(callback)
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Stop the scheduled tick and release all listeners.
    ///
    /// Later refresh requests fail with [`CoordinatorError::ShutDown`]. An
    /// in-flight fetch is allowed to complete; its result lands in a
    /// coordinator nobody is listening to.
    pub fn shutdown(&self) {
        self.inner.shut_down.store(true, Ordering::SeqCst);
        let handle = {
            let mut tick = self
                .inner
                .tick_task
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            tick.take()
        };
        if let Some(handle) = handle {
            handle.abort();
        }
        self.inner.listeners.clear();
        debug!(coordinator = %self.inner.name, "coordinator shut down");
    }

    /// Spawn the periodic refresh task.
    ///
    /// Holds only a weak reference so an otherwise-dropped coordinator does
    /// not poll forever.
    fn spawn_tick(&self, interval: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick fires immediately; the explicit first refresh
            // covers that, so consume it.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if inner.shut_down.load(Ordering::SeqCst) {
                    break;
                }
                // Skip the tick entirely while a fetch is already running.
                if inner.in_flight.lock().await.is_some() {
                    continue;
                }
                let coordinator = Coordinator { inner };
                if let Err(err) = coordinator.request_refresh().await {
                    debug!(
                        coordinator = %coordinator.inner.name,
                        error = %err,
                        "scheduled refresh failed"
                    );
                }
            }
        });
        let mut tick = self
            .inner
            .tick_task
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *tick = Some(handle);
    }
}

impl<T: Send + Sync + 'static> Inner<T> {
    /// Run one fetch and publish its result. Never called concurrently with
    /// itself; the in-flight slot guarantees that.
    async fn run_refresh(&self) -> RefreshOutcome {
        debug!(coordinator = %self.name, "refreshing");
        match self.fetcher.fetch().await {
            Ok(data) => {
                self.snapshot.store(Some(Arc::new(data)));
                self.record_success();
                debug!(coordinator = %self.name, "refresh succeeded");
                self.listeners.notify_all();
                Ok(())
            }
            Err(err) => {
                let err = Arc::new(err);
                let failures = {
                    let mut status = self.lock_status();
                    status.last_update_success = false;
                    status.last_error = Some(Arc::clone(&err));
                    status.consecutive_failures = status.consecutive_failures.saturating_add(1);
                    status.consecutive_failures
                };
                if failures >= self.failure_threshold {
                    warn!(
                        coordinator = %self.name,
                        failures,
                        error = %err,
                        "refresh failed, coordinator no longer ready"
                    );
                } else {
                    debug!(
                        coordinator = %self.name,
                        failures,
                        error = %err,
                        "refresh failed, keeping previous snapshot"
                    );
                }
                Err(err)
            }
        }
    }

    fn record_success(&self) {
        let mut status = self.lock_status();
        status.last_update_success = true;
        status.last_updated = Some(Utc::now());
        status.last_error = None;
        status.consecutive_failures = 0;
    }

    // Recover from poisoning; status holds plain values, a panicked writer
    // cannot leave them torn.
    fn lock_status(&self) -> std::sync::MutexGuard<'_, Status> {
        self.status.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<T> Clone for Coordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Drop for Inner<T> {
    fn drop(&mut self) {
        if let Some(handle) = self
            .tick_task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }
}
