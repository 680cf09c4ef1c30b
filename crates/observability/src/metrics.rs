//! Prometheus metrics infrastructure
//!
//! Metric names recorded by the offload channel and the client facade live
//! here so the exporter and the recorders agree on them.

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Requests sent to the background worker
pub const OFFLOAD_REQUESTS_TOTAL: &str = "greeks_offload_requests_total";
/// Requests rejected because no reply arrived in time
pub const OFFLOAD_TIMEOUTS_TOTAL: &str = "greeks_offload_timeouts_total";
/// Replies that arrived after their request had already been settled
pub const OFFLOAD_LATE_RESPONSES_TOTAL: &str = "greeks_offload_late_responses_total";
/// Error replies reported by the worker
pub const OFFLOAD_REMOTE_ERRORS_TOTAL: &str = "greeks_offload_remote_errors_total";
/// Outstanding requests in the correlation table
pub const OFFLOAD_PENDING: &str = "greeks_offload_pending";
/// Round trip from send to settled reply
pub const OFFLOAD_REQUEST_DURATION_SECONDS: &str = "greeks_offload_request_duration_seconds";
/// In-process recomputations, labelled by `kind` (single, batch)
pub const FALLBACK_TOTAL: &str = "greeks_fallback_total";

/// Initialize the Prometheus metrics exporter
///
/// Starts an HTTP listener exposing `/metrics` on the given port.
///
/// # Example
///
/// ```ignore
/// observability::metrics::init_metrics(9090)?;
/// // Metrics available at http://localhost:9090/metrics
/// ```
pub fn init_metrics(port: u16) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    describe_metrics();

    tracing::info!(%addr, "Metrics server listening");
    Ok(())
}

/// Register help text for every GreekX metric with the installed recorder
pub fn describe_metrics() {
    describe_counter!(OFFLOAD_REQUESTS_TOTAL, "Requests sent to the greeks worker");
    describe_counter!(OFFLOAD_TIMEOUTS_TOTAL, "Offload requests that timed out");
    describe_counter!(
        OFFLOAD_LATE_RESPONSES_TOTAL,
        "Worker replies dropped because the request was already settled"
    );
    describe_counter!(OFFLOAD_REMOTE_ERRORS_TOTAL, "Error replies from the greeks worker");
    describe_gauge!(OFFLOAD_PENDING, "Requests awaiting a worker reply");
    describe_histogram!(
        OFFLOAD_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Offload round trip duration"
    );
    describe_counter!(FALLBACK_TOTAL, "Calculations recomputed on the caller's task");
}
