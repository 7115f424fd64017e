use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry,
    TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all invalidator metrics
const PREFIX: &str = "cdn_invalidator";

lazy_static! {
    // Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Flush Metrics
    pub static ref FLUSHES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new(format!("{PREFIX}_flushes_total"), "Total number of invalidation flushes"),
        &["mode", "outcome"]
    ).expect("Failed to create flushes_total metric");

    pub static ref FLUSHED_PATHS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_flushed_paths_total"), "Total number of paths handed to a flush"),
        &["mode"]
    ).expect("Failed to create flushed_paths_total metric");

    pub static ref DROPPED_PATHS_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_dropped_paths_total"),
        "Paths lost because a debounced flush failed"
    ).expect("Failed to create dropped_paths_total metric");

    // Admission Metrics
    pub static ref REJECTED_PATHS_TOTAL: IntCounter = IntCounter::new(
        format!("{PREFIX}_rejected_paths_total"),
        "Paths rejected for not starting with '/'"
    ).expect("Failed to create rejected_paths_total metric");

    // Backend Metrics
    pub static ref BACKEND_REQUEST_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            format!("{PREFIX}_backend_request_duration_seconds"),
            "Invalidation backend request duration in seconds"
        )
        .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0])
    ).expect("Failed to create backend_request_duration_seconds metric");
}

/// Initialize all metrics
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(FLUSHES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(FLUSHED_PATHS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(DROPPED_PATHS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(REJECTED_PATHS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(BACKEND_REQUEST_DURATION_SECONDS.clone()));

    tracing::debug!("Metrics system initialized");
}

/// Record a finished flush
pub fn record_flush(mode: &str, outcome: &str, path_count: usize) {
    FLUSHES_TOTAL.with_label_values(&[mode, outcome]).inc();
    FLUSHED_PATHS_TOTAL
        .with_label_values(&[mode])
        .inc_by(path_count as f64);
}

/// Record paths lost to a failed debounced flush
pub fn record_dropped_paths(count: usize) {
    DROPPED_PATHS_TOTAL.inc_by(count as u64);
}

/// Record a rejected path
pub fn record_rejected_path() {
    REJECTED_PATHS_TOTAL.inc();
}

/// Record a backend round trip
pub fn record_backend_request(duration: Duration) {
    BACKEND_REQUEST_DURATION_SECONDS.observe(duration.as_secs_f64());
}

/// Render all registered metrics in the Prometheus text exposition format.
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => String::from_utf8(buffer).unwrap_or_default(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            String::new()
        }
    }
}
