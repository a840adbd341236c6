//! Prometheus metrics for monitoring the gateway.
//!
//! This module provides a centralized metrics registry tracking request
//! counts, latency, open SSE streams, and the events written to them.

use prometheus::{
    register_gauge_vec, register_histogram_vec, register_int_counter_vec, GaugeVec, HistogramVec,
    IntCounterVec,
};
use std::sync::OnceLock;

/// Container for all application metrics.
pub struct Metrics {
    /// Total number of requests by method, endpoint, model, and status
    pub request_count: IntCounterVec,

    /// Request duration histogram in seconds.
    ///
    /// For SSE responses this measures time to response headers, not time
    /// to stream completion.
    pub request_duration: HistogramVec,

    /// Number of SSE streams currently being relayed, by endpoint
    pub active_streams: GaugeVec,

    /// Total number of SSE events written to clients, by endpoint and kind
    /// (chunk, waiting, transcript, audio, error, done)
    pub sse_events: IntCounterVec,
}

static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Initialize the metrics registry.
///
/// This should be called once at application startup. Subsequent calls
/// will return the same instance.
///
/// # Examples
///
/// ```no_run
/// use convoai_llm_gateway::core::metrics::init_metrics;
///
/// let metrics = init_metrics();
/// metrics.request_count.with_label_values(&["GET", "/ping", "unknown", "200"]).inc();
/// ```
pub fn init_metrics() -> &'static Metrics {
    METRICS.get_or_init(|| {
        let request_count = register_int_counter_vec!(
            "llm_gateway_requests_total",
            "Total number of requests",
            &["method", "endpoint", "model", "status_code"]
        )
        .expect("Failed to register request_count metric");

        let request_duration = register_histogram_vec!(
            "llm_gateway_request_duration_seconds",
            "Request duration in seconds (time to headers for SSE responses)",
            &["method", "endpoint", "model"],
            vec![0.1, 0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0, 120.0]
        )
        .expect("Failed to register request_duration metric");

        let active_streams = register_gauge_vec!(
            "llm_gateway_active_streams",
            "Number of SSE streams currently open",
            &["endpoint"]
        )
        .expect("Failed to register active_streams metric");

        let sse_events = register_int_counter_vec!(
            "llm_gateway_sse_events_total",
            "Total number of SSE events emitted",
            &["endpoint", "kind"]
        )
        .expect("Failed to register sse_events metric");

        Metrics {
            request_count,
            request_duration,
            active_streams,
            sse_events,
        }
    })
}

/// Get the global metrics instance.
///
/// # Panics
///
/// Panics if metrics have not been initialized via [`init_metrics`].
pub fn get_metrics() -> &'static Metrics {
    METRICS.get().expect("Metrics not initialized")
}
