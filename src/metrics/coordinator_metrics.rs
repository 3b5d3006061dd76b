//! Refresh metrics tracking using OpenTelemetry.

use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector for coordinator refresh activity.
///
/// Tracks refresh attempts, success/failure rates, latencies, snapshot age,
/// and listener counts using OpenTelemetry metrics. Wrap the refresh calls
/// yourself; the coordinator does not record metrics on its own.
///
/// # Examples
///
/// ```rust,no_run
/// use pollcast::metrics::CoordinatorMetrics;
/// use opentelemetry::global;
///
/// # async fn example(coordinator: pollcast::core::Coordinator<u32>) {
/// let meter = global::meter("pollcast");
/// let metrics = CoordinatorMetrics::new(meter);
///
/// let timer = metrics.start_refresh();
/// match coordinator.request_refresh().await {
///     Ok(()) => metrics.record_refresh_success(timer),
///     Err(_) => metrics.record_refresh_failure(timer),
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct CoordinatorMetrics {
    refresh_attempts: Counter<u64>,
    refresh_success: Counter<u64>,
    refresh_failures: Counter<u64>,
    refresh_duration: Histogram<f64>,
    snapshot_age_seconds: Gauge<i64>,
    active_listeners: Gauge<i64>,
    last_success: Arc<parking_lot::Mutex<Option<Instant>>>,
}

/// Timer handle returned by [`CoordinatorMetrics::start_refresh`].
pub struct RefreshTimer {
    started: Instant,
}

impl CoordinatorMetrics {
    /// Create a new metrics collector with the provided meter.
    pub fn new(meter: Meter) -> Self {
        let refresh_attempts = meter
            .u64_counter("pollcast.refresh.attempts")
            .with_description("Total number of refresh attempts")
            .build();

        let refresh_success = meter
            .u64_counter("pollcast.refresh.success")
            .with_description("Number of successful refreshes")
            .build();

        let refresh_failures = meter
            .u64_counter("pollcast.refresh.failures")
            .with_description("Number of failed refreshes")
            .build();

        let refresh_duration = meter
            .f64_histogram("pollcast.refresh.duration")
            .with_description("Duration of refresh operations in seconds")
            .with_unit("s")
            .build();

        let snapshot_age_seconds = meter
            .i64_gauge("pollcast.snapshot.age")
            .with_description("Seconds since the last successful refresh")
            .with_unit("s")
            .build();

        let active_listeners = meter
            .i64_gauge("pollcast.listeners.active")
            .with_description("Number of registered listeners")
            .build();

        Self {
            refresh_attempts,
            refresh_success,
            refresh_failures,
            refresh_duration,
            snapshot_age_seconds,
            active_listeners,
            last_success: Arc::new(parking_lot::Mutex::new(None)),
        }
    }

    /// Start timing a refresh operation. Also counts the attempt.
    pub fn start_refresh(&self) -> RefreshTimer {
        self.refresh_attempts.add(1, &[]);
        RefreshTimer {
            started: Instant::now(),
        }
    }

    /// Record a successful refresh and its duration.
    pub fn record_refresh_success(&self, timer: RefreshTimer) {
        self.refresh_success.add(1, &[]);
        self.refresh_duration
            .record(timer.started.elapsed().as_secs_f64(), &[]);
        *self.last_success.lock() = Some(Instant::now());
        self.snapshot_age_seconds.record(0, &[]);
    }

    /// Record a failed refresh and its duration.
    pub fn record_refresh_failure(&self, timer: RefreshTimer) {
        self.refresh_failures.add(1, &[]);
        self.refresh_duration
            .record(timer.started.elapsed().as_secs_f64(), &[]);
    }

    /// Publish how stale the current snapshot is, based on the last
    /// recorded success. Call periodically from an observability task.
    pub fn observe_snapshot_age(&self) {
        if let Some(last) = *self.last_success.lock() {
            self.snapshot_age_seconds
                .record(last.elapsed().as_secs() as i64, &[]);
        }
    }

    /// Record the current listener count.
    pub fn record_listener_count(&self, count: usize) {
        self.active_listeners.record(count as i64, &[]);
    }
}
