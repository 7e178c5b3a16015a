//! Shared counter service.
//!
//! # Data Flow
//! ```text
//! POST   /counters/{key} → store.increment → {name, value: previous + 1}
//! GET    /counters/{key} → store.get       → {name, value}
//! DELETE /counters/{key} → store.reset     → {name, value: 0}
//! GET    /counters       → store.list      → [{name, value}]
//! DELETE /counters       → store.reset_all
//! ```
//!
//! # Design Decisions
//! - Per-key atomic cells: operations on one key are linearizable
//! - No cross-key consistency for enumeration
//! - State is not persisted across restarts

pub mod handlers;
pub mod store;

pub use handlers::counter_router;
pub use store::{CounterStore, CounterView};
