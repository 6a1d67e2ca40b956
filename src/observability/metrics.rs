//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by service, method, status
//! - `gateway_request_duration_seconds` (histogram): end-to-end latency
//! - `gateway_upstream_attempts_total` (counter): attempts by endpoint and outcome
//! - `gateway_retries_total` (counter): retries by service
//! - `gateway_endpoint_in_flight` (gauge): current in-flight requests
//! - `gateway_endpoint_health` (gauge): 1=healthy, 0=unhealthy
//! - `gateway_health_transitions_total` (counter): flips by cause
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::health::state::{HealthState, TransitionCause};

/// Install the Prometheus recorder and its HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    describe();
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

fn describe() {
    ::metrics::describe_counter!("gateway_requests_total", "Requests handled by the gateway");
    ::metrics::describe_histogram!(
        "gateway_request_duration_seconds",
        ::metrics::Unit::Seconds,
        "End-to-end request latency"
    );
    ::metrics::describe_counter!("gateway_upstream_attempts_total", "Upstream attempts by outcome");
    ::metrics::describe_counter!("gateway_retries_total", "Retried upstream attempts");
    ::metrics::describe_gauge!("gateway_endpoint_in_flight", "In-flight requests per endpoint");
    ::metrics::describe_gauge!("gateway_endpoint_health", "1 if the endpoint is healthy");
    ::metrics::describe_counter!("gateway_health_transitions_total", "Endpoint health flips");
}

/// Record one finished inbound request.
pub fn record_request(service: &str, method: &str, status: u16, start: Instant) {
    let labels = [
        ("service", service.to_string()),
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    ::metrics::counter!("gateway_requests_total", &labels).increment(1);
    ::metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record one upstream attempt; `outcome` is `ok`, an upstream status class or an error kind.
pub fn record_attempt(service: &str, endpoint: &str, outcome: &str) {
    ::metrics::counter!(
        "gateway_upstream_attempts_total",
        "service" => service.to_string(),
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub fn record_retry(service: &str) {
    ::metrics::counter!("gateway_retries_total", "service" => service.to_string()).increment(1);
}

pub fn record_in_flight(service: &str, endpoint: &str, in_flight: usize) {
    ::metrics::gauge!(
        "gateway_endpoint_in_flight",
        "service" => service.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .set(in_flight as f64);
}

pub fn record_endpoint_health(service: &str, endpoint: &str, healthy: bool) {
    ::metrics::gauge!(
        "gateway_endpoint_health",
        "service" => service.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_health_transition(service: &str, endpoint: &str, to: HealthState, cause: TransitionCause) {
    record_endpoint_health(service, endpoint, to == HealthState::Healthy);
    ::metrics::counter!(
        "gateway_health_transitions_total",
        "service" => service.to_string(),
        "endpoint" => endpoint.to_string(),
        "to" => to.as_str(),
        "cause" => cause.as_str()
    )
    .increment(1);
}
