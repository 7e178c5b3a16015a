//! Service registry and discovery subsystem.
//!
//! # Data Flow
//! ```text
//! Registry role:
//!     POST /registry/instances → table.rs (lease refresh)
//!     heartbeat.rs LeaseReaper → table.rs (suspend / expire late leases)
//!
//! Every other role:
//!     heartbeat.rs Registrar → client.rs → backend.rs (embedded | remote)
//!     gateway / items resolve → client.rs (staleness cache) → backend.rs
//! ```
//!
//! # Design Decisions
//! - Resolution returns an empty list, never an error
//! - Many instances may share a logical name; the table owns the set
//! - Cached resolutions lag membership by at most one staleness window

pub mod backend;
pub mod client;
pub mod handlers;
pub mod heartbeat;
pub mod instance;
pub mod table;

pub use backend::{EmbeddedRegistry, RegistryBackend, RemoteRegistry};
pub use client::RegistryClient;
pub use instance::ServiceInstance;
pub use table::InstanceTable;
