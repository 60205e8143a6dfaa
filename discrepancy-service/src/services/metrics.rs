//! Prometheus metrics for discrepancy-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};

/// Counter for reconciliation runs by outcome.
pub static RECONCILIATION_RUNS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "discrepancy_reconciliation_runs_total",
        "Total number of reconciliation runs",
        &["status"]
    )
    .expect("Failed to register RECONCILIATION_RUNS")
});

/// Counter for classified discrepancies by type.
pub static DISCREPANCIES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "discrepancy_discrepancies_total",
        "Total number of classified discrepancies",
        &["discrepancy_type"]
    )
    .expect("Failed to register DISCREPANCIES")
});

/// Counter for batch commits by outcome.
pub static BATCH_COMMITS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "discrepancy_batch_commits_total",
        "Total number of discrepancy batch commits",
        &["status"]
    )
    .expect("Failed to register BATCH_COMMITS")
});

pub static BATCH_COMMIT_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "discrepancy_batch_commit_duration_seconds",
        "Discrepancy batch commit duration in seconds",
        &["status"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .expect("Failed to register BATCH_COMMIT_DURATION")
});

/// Histogram for database query duration.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "discrepancy_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]
    )
    .expect("Failed to register DB_QUERY_DURATION")
});

/// Counter for errors.
pub static ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "discrepancy_errors_total",
        "Total number of errors",
        &["error_type"]
    )
    .expect("Failed to register ERRORS")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&RECONCILIATION_RUNS);
    Lazy::force(&DISCREPANCIES);
    Lazy::force(&BATCH_COMMITS);
    Lazy::force(&BATCH_COMMIT_DURATION);
    Lazy::force(&DB_QUERY_DURATION);
    Lazy::force(&ERRORS);
}

/// Get all metrics as Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Record a finished reconciliation run.
pub fn record_reconciliation_run(status: &str) {
    RECONCILIATION_RUNS.with_label_values(&[status]).inc();
}

/// Record classified discrepancies of one type.
pub fn record_discrepancies(discrepancy_type: &str, count: usize) {
    DISCREPANCIES
        .with_label_values(&[discrepancy_type])
        .inc_by(count as f64);
}

/// Record a batch commit attempt and its duration.
pub fn record_batch_commit(status: &str, duration_secs: f64) {
    BATCH_COMMITS.with_label_values(&[status]).inc();
    BATCH_COMMIT_DURATION
        .with_label_values(&[status])
        .observe(duration_secs);
}

/// Record an error.
pub fn record_error(error_type: &str) {
    ERRORS.with_label_values(&[error_type]).inc();
}
