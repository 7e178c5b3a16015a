//! Resilient invocation of remote calls.
//!
//! # Responsibilities
//! - Keep one circuit breaker per (caller, target service) pair
//! - Short-circuit to the fallback while the breaker is open
//! - Enforce the call deadline; a late response is discarded
//! - Classify outcomes and feed them to the breaker window
//!
//! # Design Decisions
//! - `invoke` always returns a response: the real one or the fallback's
//! - The fallback is a required argument with a fixed signature
//! - No automatic retries: one invoke is at most one network call

use axum::http::StatusCode;
use dashmap::DashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::config::BreakerConfig;
use crate::observability::metrics;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::resilience::transport::{Endpoint, OutboundRequest, OutboundResponse, Transport};

/// Why a call was diverted to its fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    /// The call exceeded its deadline.
    Timeout,
    /// Connection or protocol failure before a response arrived.
    Transport(String),
    /// The target answered with a failure status.
    Status(StatusCode),
    /// The breaker was open; no call was attempted.
    BreakerOpen,
}

impl CallFailure {
    /// Short label for logs, metrics and fallback payloads.
    pub fn reason(&self) -> &'static str {
        match self {
            CallFailure::Timeout => "timeout",
            CallFailure::Transport(_) => "connection_failure",
            CallFailure::Status(_) => "failure_status",
            CallFailure::BreakerOpen => "breaker_open",
        }
    }
}

impl fmt::Display for CallFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallFailure::Timeout => write!(f, "call timed out"),
            CallFailure::Transport(e) => write!(f, "transport failure: {}", e),
            CallFailure::Status(status) => write!(f, "failure status {}", status),
            CallFailure::BreakerOpen => write!(f, "circuit open"),
        }
    }
}

/// Wraps every outbound call made by one caller.
pub struct ResilientInvoker {
    caller: String,
    transport: Arc<dyn Transport>,
    config: BreakerConfig,
    breakers: DashMap<String, Arc<CircuitBreaker>>,
}

impl ResilientInvoker {
    pub fn new(caller: impl Into<String>, transport: Arc<dyn Transport>, config: BreakerConfig) -> Self {
        Self {
            caller: caller.into(),
            transport,
            config,
            breakers: DashMap::new(),
        }
    }

    pub fn caller(&self) -> &str {
        &self.caller
    }

    /// Call `endpoint`, or answer through `fallback` with the original request
    /// and the condition that prevented a real response.
    pub async fn invoke<F>(&self, endpoint: &Endpoint, request: OutboundRequest, fallback: F) -> OutboundResponse
    where
        F: FnOnce(OutboundRequest, CallFailure) -> OutboundResponse,
    {
        let breaker = self.breaker(&endpoint.service);
        let Some(permit) = breaker.try_acquire() else {
            return self.fall_back(endpoint, request, CallFailure::BreakerOpen, fallback);
        };

        let start = Instant::now();
        let retained = request.clone();
        let outcome = tokio::time::timeout(
            self.config.call_timeout(),
            self.transport.send(endpoint, request),
        )
        .await;

        let failure = match outcome {
            Ok(Ok(response)) if !self.is_failure_status(response.status) => {
                permit.success();
                metrics::record_outbound(&endpoint.service, response.status.as_u16(), start);
                return response;
            }
            Ok(Ok(response)) => CallFailure::Status(response.status),
            Ok(Err(e)) => CallFailure::Transport(e.to_string()),
            Err(_) => CallFailure::Timeout,
        };
        permit.failure();
        metrics::record_outbound(&endpoint.service, 0, start);

        tracing::warn!(
            caller = %self.caller,
            endpoint = %endpoint,
            error = %failure,
            "Remote call failed"
        );
        self.fall_back(endpoint, retained, failure, fallback)
    }

    /// State of the breaker for `service`, if any call has been made to it.
    pub fn breaker_state(&self, service: &str) -> Option<CircuitState> {
        self.breakers.get(service).map(|b| b.state())
    }

    fn breaker(&self, service: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.get(service) {
            return breaker.clone();
        }
        self.breakers
            .entry(service.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(service, self.config.clone())))
            .clone()
    }

    fn is_failure_status(&self, status: StatusCode) -> bool {
        status.is_server_error() || (self.config.client_errors_are_failures && status.is_client_error())
    }

    fn fall_back<F>(
        &self,
        endpoint: &Endpoint,
        request: OutboundRequest,
        failure: CallFailure,
        fallback: F,
    ) -> OutboundResponse
    where
        F: FnOnce(OutboundRequest, CallFailure) -> OutboundResponse,
    {
        tracing::debug!(
            caller = %self.caller,
            target_service = %endpoint.service,
            reason = failure.reason(),
            "Serving fallback"
        );
        metrics::record_fallback(&endpoint.service, failure.reason());
        fallback(request, failure)
    }
}
