//! Optional OpenTelemetry metrics for coordinator activity.

mod coordinator_metrics;

pub use coordinator_metrics::{CoordinatorMetrics, RefreshTimer};
