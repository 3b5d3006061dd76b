//! The fetch contract consumed by coordinators.

use crate::error::FetchError;
use async_trait::async_trait;
use std::future::Future;

/// A zero-argument asynchronous fetch operation.
///
/// One implementation exists per integration instance: it talks to the
/// vendor SDK or cloud API and returns the full remote state as a fresh
/// snapshot value. The coordinator calls it with no lock held, so it is free
/// to suspend on I/O for as long as it needs. Timeouts are its own
/// responsibility; raise [`FetchError::Timeout`] if a deadline passes.
///
/// Closures work directly via the blanket [`FetchFn`] adapter used by
/// [`CoordinatorBuilder::with_fetch_fn`](crate::core::CoordinatorBuilder::with_fetch_fn):
///
/// ```rust,no_run
/// use pollcast::prelude::*;
/// use std::collections::HashMap;
///
/// # async fn example() -> Result<()> {
/// let coordinator = Coordinator::builder()
///     .with_name("demo")
///     .with_fetch_fn(|| async {
///         let mut data = HashMap::new();
///         data.insert("temp".to_string(), 21.5);
///         Ok(data)
///     })
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Fetch<T>: Send + Sync {
    /// Fetch the current remote state.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the remote call fails; the coordinator
    /// treats every variant identically (record, keep the old snapshot).
    async fn fetch(&self) -> std::result::Result<T, FetchError>;
}

/// Adapter turning an async closure into a [`Fetch`] implementation.
pub struct FetchFn<F>(F);

impl<F> FetchFn<F> {
    /// Wrap an async closure.
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<T, F, Fut> Fetch<T> for FetchFn<F>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<T, FetchError>> + Send,
{
    async fn fetch(&self) -> std::result::Result<T, FetchError> {
        (self.0)().await
    }
}
