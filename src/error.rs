//! Error taxonomy shared across subsystems.
//!
//! # Design Decisions
//! - Resolution, remote-call and breaker-open failures never escape the
//!   invoker or gateway; they become fallback responses
//! - Route misses surface to the client as 404
//! - Configuration errors are fatal at startup only

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Failures talking to a registry backend.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry unreachable: {0}")]
    Unreachable(String),

    #[error("registry returned status {0}")]
    Status(u16),

    #[error("registry response could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RegistryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RegistryError::Decode(err.to_string())
        } else {
            RegistryError::Unreachable(err.to_string())
        }
    }
}

/// Failures produced by an outbound transport before a response exists.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("response body failed: {0}")]
    Body(String),
}

/// Errors the gateway surfaces to its own clients.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no route matches path {0}")]
    RouteNotFound(String),

    #[error("request body rejected: {0}")]
    Body(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = match &self {
            GatewayError::RouteNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Body(_) => StatusCode::BAD_REQUEST,
        };
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_route_not_found_is_404() {
        let response = GatewayError::RouteNotFound("/nope".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = ConfigError::Validation(vec![
            ValidationError::new("breaker.window_size", "must be greater than 0"),
            ValidationError::new("routes[0].prefix", "must start with '/'"),
        ]);
        let text = err.to_string();
        assert!(text.contains("breaker.window_size"));
        assert!(text.contains(", routes[0].prefix"));
    }
}
