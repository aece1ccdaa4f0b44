//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Lendrate metrics
pub const METRICS_PREFIX: &str = "lendrate";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 25ms, P99 < 100ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001,  // 1ms
    0.005,  // 5ms
    0.010,  // 10ms
    0.025,  // 25ms - P50 target
    0.050,  // 50ms
    0.100,  // 100ms - P99 target
    0.250,  // 250ms
    0.500,  // 500ms
    1.000,  // 1s
    2.500,  // 2.5s
    5.000,  // 5s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Rate table metrics
    describe_counter!(
        format!("{}_rate_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Rate table writes by model, operation and outcome"
    );

    describe_counter!(
        format!("{}_rate_overlap_rejections_total", METRICS_PREFIX),
        Unit::Count,
        "Writes rejected because they would overlap an active range"
    );

    describe_counter!(
        format!("{}_rate_resolutions_total", METRICS_PREFIX),
        Unit::Count,
        "Term-model rate lookups by category and outcome"
    );

    describe_counter!(
        format!("{}_legacy_rate_resolutions_total", METRICS_PREFIX),
        Unit::Count,
        "Single-rate model lookups by outcome"
    );

    // Calculator metrics
    describe_counter!(
        format!("{}_loan_quotes_total", METRICS_PREFIX),
        Unit::Count,
        "Loan quotes computed"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Record a write against one of the rate tables
pub fn record_rate_write(model: &str, operation: &str, outcome: &str) {
    counter!(
        format!("{}_rate_writes_total", METRICS_PREFIX),
        "model" => model.to_string(),
        "operation" => operation.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a write refused for overlapping an active range
pub fn record_overlap_rejection(category: &str, terms: usize) {
    counter!(
        format!("{}_rate_overlap_rejections_total", METRICS_PREFIX),
        "category" => category.to_string()
    )
    .increment(terms.max(1) as u64);
}

/// Record a term-model rate lookup
pub fn record_resolution(category: &str, outcome: &str) {
    counter!(
        format!("{}_rate_resolutions_total", METRICS_PREFIX),
        "category" => category.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a single-rate model lookup. Those rows carry no category.
pub fn record_legacy_resolution(outcome: &str) {
    counter!(
        format!("{}_legacy_rate_resolutions_total", METRICS_PREFIX),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a computed loan quote
pub fn record_quote(category: &str, term_months: u32) {
    counter!(
        format!("{}_loan_quotes_total", METRICS_PREFIX),
        "category" => category.to_string(),
        "term" => term_months.to_string()
    )
    .increment(1);
}
