//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define gateway metrics (requests, dispatch outcomes, breaker health)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `gateway_requests_total` (counter): inbound requests by method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_dispatch_total` (counter): dispatch results by outcome
//! - `gateway_dispatch_duration_seconds` (histogram): dispatch latency
//! - `gateway_circuit_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `gateway_circuit_breaker_transitions_total` (counter): by from/to
//! - `gateway_calls_not_permitted_total` (counter): fast rejections
//! - `gateway_retry_attempts_total` (counter): re-invocations after a failure
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    counter!("gateway_requests_total", &labels).increment(1);
    histogram!("gateway_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_dispatch(outcome: &'static str, start: Instant) {
    counter!("gateway_dispatch_total", "outcome" => outcome).increment(1);
    histogram!("gateway_dispatch_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_state(breaker: &str, state: CircuitState) {
    gauge!("gateway_circuit_breaker_state", "breaker" => breaker.to_string()).set(state as u8 as f64);
}

pub fn record_breaker_transition(breaker: &str, from: CircuitState, to: CircuitState) {
    counter!(
        "gateway_circuit_breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    record_breaker_state(breaker, to);
}

pub fn record_call_not_permitted(breaker: &str) {
    counter!("gateway_calls_not_permitted_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_retry_attempt() {
    counter!("gateway_retry_attempts_total").increment(1);
}
