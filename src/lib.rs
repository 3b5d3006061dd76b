//! # pollcast
//!
//! Coalesced polling coordinator with lock-free snapshots and entity
//! listener fan-out.
//!
//! ## Overview
//!
//! `pollcast` implements the update-coordinator pattern that smart-home hub
//! runtimes use to keep hundreds of entities in sync with remote device
//! state:
//! - One coordinator per integration instance owns the remote fetch and its
//!   cadence
//! - The latest successful result is cached as an immutable snapshot with
//!   lock-free reads via `arc-swap`
//! - Concurrent refresh requests coalesce into the fetch already in flight
//! - Listeners are notified only after a successful fetch, in registration
//!   order; entities keep showing the last-known-good value across failures
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pollcast::prelude::*;
//! use std::collections::HashMap;
//! use std::time::Duration;
//!
//! # async fn example() -> pollcast::error::Result<()> {
//! let coordinator = Coordinator::builder()
//!     .with_name("airthings")
//!     .with_interval(Duration::from_secs(30))
//!     .with_fetch_fn(|| async {
//!         // Talk to the vendor SDK / cloud API here.
//!         let mut data = HashMap::new();
//!         data.insert("temp".to_string(), 21.5);
//!         Ok(data)
//!     })
//!     .build()?;
//!
//! // Setup-time refresh: a failure here means "not ready, retry setup".
//! coordinator.refresh_now().await?;
//!
//! let _listener = coordinator.add_listener(|| {
//!     // Pull the fresh snapshot and republish entity state.
//! });
//!
//! let snapshot = coordinator.data().expect("first refresh succeeded");
//! println!("temp: {:?}", snapshot.get("temp"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Features
//!
//! - **Lock-free snapshot reads**: readers never block the refresh path
//! - **Coalescing**: the fetch function runs at most once per refresh burst
//! - **Failure shielding**: transient fetch errors keep the previous
//!   snapshot visible; only the setup-time first refresh propagates
//! - **Not-ready tracking**: a configurable run of consecutive failures
//!   flips the coordinator so entities can report unavailable
//! - **Entity bindings**: attach/detach lifecycle with guaranteed release,
//!   deriving per-entity state (`Unavailable` / `Unknown` / `Value`)
//! - **Typed topics**: publish/subscribe channels keyed by topic string
//!   with typed payloads
//!
//! ## Feature Flags
//!
//! ```toml
//! [dependencies]
//! pollcast = { version = "0.1", features = ["metrics"] }
//! ```
//!
//! `metrics` adds an OpenTelemetry collector for refresh activity.

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod entity;
pub mod error;
pub mod notify;
pub mod registry;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{Coordinator, CoordinatorBuilder, Fetch};
    pub use crate::error::{CoordinatorError, FetchError, Result};
}
