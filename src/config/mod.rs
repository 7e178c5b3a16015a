//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → MeshConfig (validated, immutable)
//!     → handed to each component at construction
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup and never reloaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::BreakerConfig;
pub use schema::GatewayConfig;
pub use schema::ItemsConfig;
pub use schema::MeshConfig;
pub use schema::ObservabilityConfig;
pub use schema::RegistryConfig;
pub use schema::RegistryMode;
pub use schema::Role;
pub use schema::RouteConfig;
pub use schema::Selection;
pub use schema::ServiceConfig;
