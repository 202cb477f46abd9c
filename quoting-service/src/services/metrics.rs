//! Prometheus metrics for quoting-service.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::{Lazy, OnceCell};
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Recorder behind the `metrics` facade used by the shared HTTP middleware.
/// `None` when another recorder was installed first.
static HTTP_METRICS_HANDLE: OnceCell<Option<PrometheusHandle>> = OnceCell::new();

/// Derivation passes by trigger (initial_load, edit, product_selected).
pub static DERIVATION_PASSES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoting_derivation_passes_total",
        "Total number of quote line derivation passes",
        &["trigger"]
    )
    .expect("Failed to register derivation_passes_total")
});

/// Derived field writes by field name.
pub static FIELD_WRITES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoting_field_writes_total",
        "Total number of derived field writes",
        &["field"]
    )
    .expect("Failed to register field_writes_total")
});

/// Batch saves by outcome.
pub static QUOTE_SAVES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoting_quote_saves_total",
        "Total number of quote batch saves by status",
        &["status"] // ok, rejected, failed
    )
    .expect("Failed to register quote_saves_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "quoting_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "quoting_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    HTTP_METRICS_HANDLE.get_or_init(|| match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "HTTP metrics recorder not installed");
            None
        }
    });
    Lazy::force(&DERIVATION_PASSES_TOTAL);
    Lazy::force(&FIELD_WRITES_TOTAL);
    Lazy::force(&QUOTE_SAVES_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format: the quoting registry followed by
/// the HTTP request metrics.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut text = encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default();

    if let Some(handle) = HTTP_METRICS_HANDLE.get().and_then(Option::as_ref) {
        text.push_str(&handle.render());
    }
    text
}
