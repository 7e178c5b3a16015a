//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! invoke(endpoint, request, fallback):
//!     → invoker.rs (pick breaker for caller → target)
//!     → circuit_breaker.rs (admit, short-circuit, or admit single trial)
//!     → transport.rs (network call, bounded by call timeout)
//!     → window.rs (record outcome, evaluate failure ratio)
//!     → real response, or fallback(request, failure)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every outbound call has a deadline
//! - No automatic retries of remote calls (downstream effects are not idempotent)
//! - Circuit breaker prevents cascading failures
//! - Backoff is only used for registry registration

pub mod backoff;
pub mod circuit_breaker;
pub mod invoker;
pub mod transport;
pub mod window;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use invoker::{CallFailure, ResilientInvoker};
pub use transport::{Endpoint, HyperTransport, OutboundRequest, OutboundResponse, Transport};
