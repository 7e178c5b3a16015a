//! Gateway subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → routing (longest prefix → logical service)
//!     → registry client (service → healthy instances)
//!     → resilient invoker (breaker check → network call or fallback)
//!     → response back to the client unchanged
//! ```
//!
//! # Design Decisions
//! - The gateway knows logical names only, never backend topology
//! - Route misses are client errors (404), not fallbacks
//! - Load balancing is out of scope: first or random healthy instance

pub mod proxy;

pub use proxy::GatewayRouter;
