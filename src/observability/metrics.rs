//! Metrics collection and exposition.
//!
//! # Metrics
//! - `mesh_requests_total` (counter): gateway requests by method, status, service
//! - `mesh_request_duration_seconds` (histogram): gateway latency
//! - `mesh_outbound_calls_total` (counter): protected calls by service, status (0 = failed)
//! - `mesh_outbound_duration_seconds` (histogram): protected call latency
//! - `mesh_fallbacks_total` (counter): fallbacks by target, reason
//! - `mesh_breaker_transitions_total` (counter): breaker transitions by target, to
//! - `mesh_breaker_state` (gauge): 0=closed, 1=open, 2=half_open, by target
//! - `mesh_registry_instances` (gauge): live instances per logical name
//! - `mesh_counter_ops_total` (counter): counter store operations by op

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

use crate::resilience::CircuitState;

/// Install the Prometheus exporter and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    let builder = PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("service", service.to_string()),
    ];
    counter!("mesh_requests_total", &labels).increment(1);
    histogram!("mesh_request_duration_seconds", &labels).record(start.elapsed().as_secs_f64());
}

pub fn record_outbound(service: &str, status: u16, start: Instant) {
    let labels = [("service", service.to_string()), ("status", status.to_string())];
    counter!("mesh_outbound_calls_total", &labels).increment(1);
    histogram!("mesh_outbound_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_fallback(service: &str, reason: &str) {
    counter!(
        "mesh_fallbacks_total",
        "target" => service.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

pub fn record_breaker_transition(service: &str, to: CircuitState) {
    counter!(
        "mesh_breaker_transitions_total",
        "target" => service.to_string(),
        "to" => to.as_str()
    )
    .increment(1);
    gauge!("mesh_breaker_state", "target" => service.to_string()).set(to as u8 as f64);
}

pub fn record_registry_size(name: &str, instances: usize) {
    gauge!("mesh_registry_instances", "service" => name.to_string()).set(instances as f64);
}

pub fn record_counter_op(op: &'static str) {
    counter!("mesh_counter_ops_total", "op" => op).increment(1);
}
