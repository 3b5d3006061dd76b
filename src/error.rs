//! Error types for pollcast.

use std::sync::Arc;
use std::time::Duration;

/// Result type alias for pollcast operations.
pub type Result<T> = std::result::Result<T, CoordinatorError>;

/// Errors surfaced by coordinators, registries, and topic channels.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// A refresh attempt failed. The previous snapshot (if any) is retained.
    #[error("Fetch failed: {0}")]
    Fetch(Arc<FetchError>),

    /// The mandatory first refresh failed; the owning integration should
    /// report itself not ready and let the host retry setup later.
    #[error("Initial refresh failed, integration not ready: {source}")]
    NotReady {
        /// The fetch failure that blocked setup.
        source: Arc<FetchError>,
    },

    /// A refresh was requested after the coordinator was shut down.
    #[error("Coordinator has been shut down")]
    ShutDown,

    /// The builder was finalized without a fetch operation.
    #[error("No fetch operation configured")]
    MissingFetcher,

    /// A topic was used with a payload type other than the one it was
    /// created with.
    #[error("Topic '{topic}' carries a different payload type")]
    TopicTypeMismatch {
        /// The offending topic key.
        topic: String,
    },

    /// An integration instance key was registered twice.
    #[error("Instance '{0}' is already registered")]
    DuplicateInstance(String),

    /// Generic error for other cases.
    #[error("Coordinator error: {0}")]
    Other(String),
}

/// Failure raised by a [`Fetch`](crate::core::Fetch) implementation.
///
/// These are the recoverable conditions a remote poll can hit. The
/// coordinator records them and keeps the last-known-good snapshot visible;
/// only the first refresh at setup time propagates one to the caller.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The transport to the device or cloud API failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The remote call did not complete in time. The timeout itself is the
    /// fetcher's own; the coordinator imposes none.
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The remote rejected the credentials. Distinct from transport errors
    /// because retrying without reauthorizing is pointless.
    #[error("Authentication rejected: {0}")]
    Auth(String),

    /// The remote answered with a payload the integration could not decode.
    #[error("Malformed payload: {0}")]
    Payload(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic fetch error for other cases.
    #[error("Fetch error: {0}")]
    Other(String),
}

impl From<FetchError> for CoordinatorError {
    fn from(err: FetchError) -> Self {
        CoordinatorError::Fetch(Arc::new(err))
    }
}
