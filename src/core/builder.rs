//! Builder for constructing Coordinator instances.

use crate::core::fetch::{Fetch, FetchFn};
use crate::core::Coordinator;
use crate::error::{CoordinatorError, FetchError, Result};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// How many consecutive fetch failures flip a coordinator to not-ready
/// unless overridden.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Builder for constructing a [`Coordinator`].
///
/// # Examples
///
/// ```rust,no_run
/// use pollcast::prelude::*;
/// use std::time::Duration;
///
/// # async fn example() -> Result<()> {
/// let coordinator = Coordinator::builder()
///     .with_name("hue-bridge")
///     .with_interval(Duration::from_secs(30))
///     .with_failure_threshold(5)
///     .with_fetch_fn(|| async { Ok(vec![1_u8, 2, 3]) })
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct CoordinatorBuilder<T> {
    name: String,
    fetcher: Option<Arc<dyn Fetch<T>>>,
    interval: Option<Duration>,
    failure_threshold: u32,
}

impl<T: Send + Sync + 'static> CoordinatorBuilder<T> {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            name: "coordinator".to_string(),
            fetcher: None,
            interval: None,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
        }
    }

    /// Set the name used in log output, conventionally the integration's
    /// domain (e.g. `"braviatv"`).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Enable the scheduled tick: an automatic refresh every `interval`,
    /// skipped while a fetch is already in flight.
    ///
    /// Without an interval the coordinator refreshes only on demand.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set how many consecutive failures mark the coordinator not ready.
    ///
    /// Defaults to [`DEFAULT_FAILURE_THRESHOLD`]. Exact retry pacing is
    /// deliberately left to the host's scheduler and the tick cadence.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    /// Set the fetch operation from a [`Fetch`] implementation.
    pub fn with_fetcher<F>(mut self, fetcher: F) -> Self
    where
        F: Fetch<T> + 'static,
    {
        self.fetcher = Some(Arc::new(fetcher));
        self
    }

    /// Set the fetch operation from an async closure.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use pollcast::prelude::*;
    ///
    /// # async fn example() -> Result<()> {
    /// let coordinator = Coordinator::builder()
    ///     .with_fetch_fn(|| async { Ok("snapshot".to_string()) })
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_fetch_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, FetchError>> + Send + 'static,
    {
        self.fetcher = Some(Arc::new(FetchFn::new(f)));
        self
    }

    /// Build the coordinator.
    ///
    /// When an interval is set this spawns the tick task, so it must run
    /// inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::MissingFetcher`] if no fetch operation
    /// was configured.
    pub fn build(self) -> Result<Coordinator<T>> {
        let fetcher = self.fetcher.ok_or(CoordinatorError::MissingFetcher)?;
        Ok(Coordinator::from_parts(
            self.name,
            fetcher,
            self.interval,
            self.failure_threshold,
        ))
    }
}

impl<T: Send + Sync + 'static> Default for CoordinatorBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync + 'static> Coordinator<T> {
    /// Create a new builder for constructing a coordinator.
    pub fn builder() -> CoordinatorBuilder<T> {
        CoordinatorBuilder::new()
    }
}
