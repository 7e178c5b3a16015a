//! HTTP surface shared by every role.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, role router)
//!     → request.rs (assign / propagate x-request-id)
//!     → role handlers (registry, counter, items, gateway)
//!     → response.rs (fallback bodies when an upstream is degraded)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::HttpServer;
