//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (longest-prefix lookup)
//!     → matcher.rs (segment-aware prefix test)
//!     → Return: RouteMatch {service, forward_path} or no match
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Sort by prefix length
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use router::{RouteMatch, RouteRule, RouteTable};
