//! Degraded responses served in place of unavailable upstreams.
//!
//! # Design Decisions
//! - Every fallback body is JSON and carries the requested path/key and a
//!   `requestedAt` timestamp (milliseconds since the Unix epoch)
//! - Gateway fallbacks use 503; item fallbacks are ordinary 200 responses

use axum::http::StatusCode;
use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::resilience::{CallFailure, OutboundResponse};

/// Milliseconds since the Unix epoch.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// No healthy instance exists for `service`; nothing was called.
pub fn service_unavailable(service: &str, path: &str) -> OutboundResponse {
    OutboundResponse::json(
        StatusCode::SERVICE_UNAVAILABLE,
        &json!({
            "message": "service unavailable",
            "service": service,
            "path": path,
            "requestedAt": epoch_millis(),
        }),
    )
}

/// The call to `service` failed or was short-circuited.
pub fn upstream_degraded(service: &str, path: &str, failure: &CallFailure) -> OutboundResponse {
    OutboundResponse::json(
        StatusCode::SERVICE_UNAVAILABLE,
        &json!({
            "message": "upstream degraded",
            "service": service,
            "path": path,
            "reason": failure.reason(),
            "requestedAt": epoch_millis(),
        }),
    )
}
