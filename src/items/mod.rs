//! Item services (the "m1"/"m2" style callers).
//!
//! # Data Flow
//! ```text
//! GET /items/{id}
//!     → counter call  (registry → invoker → POST /counters/{key})
//!     → resource call (URI template → invoker → GET resource)
//!     → merged JSON object
//! ```

pub mod handlers;
pub mod service;

pub use handlers::items_router;
pub use service::ItemsService;
