//! Service mesh building blocks: registry, counter store, resilient invoker
//! and gateway router, plus the HTTP surfaces that expose them.

pub mod config;
pub mod counter;
pub mod error;
pub mod gateway;
pub mod http;
pub mod items;
pub mod lifecycle;
pub mod observability;
pub mod registry;
pub mod resilience;
pub mod routing;

pub use config::schema::MeshConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
