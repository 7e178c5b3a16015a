//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a mesh
//! process. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration for a mesh process.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct MeshConfig {
    /// Identity and role of this process.
    pub service: ServiceConfig,

    /// Service registry settings.
    pub registry: RegistryConfig,

    /// Circuit breaker settings for every outbound call.
    pub breaker: BreakerConfig,

    /// Gateway route rules (gateway role only).
    pub routes: Vec<RouteConfig>,

    /// Gateway forwarding settings.
    pub gateway: GatewayConfig,

    /// Item service settings (items role only).
    pub items: ItemsConfig,

    /// Inbound timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Which surface a process serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Registry,
    Counter,
    Items,
    Gateway,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Registry => "registry",
            Role::Counter => "counter",
            Role::Items => "items",
            Role::Gateway => "gateway",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "registry" => Ok(Role::Registry),
            "counter" => Ok(Role::Counter),
            "items" => Ok(Role::Items),
            "gateway" => Ok(Role::Gateway),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Process identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Logical service name this process registers under.
    pub name: String,

    /// Role served by this process.
    pub role: Role,

    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Address other services should use to reach this process.
    /// Defaults to `bind_address` when unset.
    pub advertise_address: Option<String>,

    /// Greeting returned by the root status endpoint.
    pub message: String,

    /// Location the configuration was loaded from, echoed by the root status endpoint.
    pub config_uri: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "gateway".to_string(),
            role: Role::Gateway,
            bind_address: "0.0.0.0:8080".to_string(),
            advertise_address: None,
            message: "Welcome!".to_string(),
            config_uri: "file://mesh.toml".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Address published to the registry.
    pub fn advertised(&self) -> &str {
        self.advertise_address.as_deref().unwrap_or(&self.bind_address)
    }
}

/// Where the authoritative instance table lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryMode {
    /// Table held in this process.
    Embedded,
    /// Table held by a registry server reached over HTTP.
    Remote,
}

/// A statically seeded registry entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticInstance {
    /// Logical service name.
    pub name: String,
    /// Network address (host:port).
    pub address: String,
}

/// Registry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Embedded or remote table.
    pub mode: RegistryMode,

    /// Registry server base URL (remote mode).
    pub url: Option<String>,

    /// Maximum age of a cached resolution in milliseconds.
    pub staleness_ms: u64,

    /// Timeout for a single remote resolution in milliseconds.
    pub resolve_timeout_ms: u64,

    /// Interval between self-registration heartbeats in seconds.
    pub heartbeat_interval_secs: u64,

    /// Lease lifetime without heartbeat before an instance is removed, in seconds.
    pub lease_ttl_secs: u64,

    /// Register this process at startup and heartbeat until shutdown.
    pub register_self: bool,

    /// Instances seeded into an embedded table at startup.
    pub instances: Vec<StaticInstance>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            mode: RegistryMode::Embedded,
            url: None,
            staleness_ms: 3_000,
            resolve_timeout_ms: 500,
            heartbeat_interval_secs: 10,
            lease_ttl_secs: 30,
            register_self: false,
            instances: Vec::new(),
        }
    }
}

impl RegistryConfig {
    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.staleness_ms)
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Number of most recent outcomes kept in the rolling window.
    pub window_size: usize,

    /// Optional age limit for outcomes in the window, in milliseconds.
    pub window_duration_ms: Option<u64>,

    /// Failure ratio that must be strictly exceeded to open the circuit.
    pub failure_threshold_ratio: f64,

    /// Outcomes required in the window before the ratio is evaluated.
    /// Defaults to `window_size`.
    pub minimum_calls: Option<usize>,

    /// Time spent OPEN before a trial call is admitted, in milliseconds.
    pub open_duration_ms: u64,

    /// Deadline for a single outbound call, in milliseconds.
    pub call_timeout_ms: u64,

    /// Treat 4xx responses as failures.
    pub client_errors_are_failures: bool,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 20,
            window_duration_ms: None,
            failure_threshold_ratio: 0.5,
            minimum_calls: None,
            open_duration_ms: 5_000,
            call_timeout_ms: 1_000,
            client_errors_are_failures: false,
        }
    }
}

impl BreakerConfig {
    pub fn open_duration(&self) -> Duration {
        Duration::from_millis(self.open_duration_ms)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn window_duration(&self) -> Option<Duration> {
        self.window_duration_ms.map(Duration::from_millis)
    }

    /// Effective minimum number of calls before evaluation.
    pub fn minimum_calls(&self) -> usize {
        self.minimum_calls.unwrap_or(self.window_size)
    }
}

/// Gateway route rule mapping a path prefix to a logical service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Path prefix to match (segment-aware).
    pub prefix: String,

    /// Logical service name to forward to.
    pub service: String,

    /// Remove the matched prefix before forwarding.
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: bool,
}

fn default_strip_prefix() -> bool {
    true
}

/// How the gateway picks among healthy instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Selection {
    First,
    Random,
}

/// Gateway forwarding configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Instance selection policy.
    pub selection: Selection,

    /// Maximum buffered request/response body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            selection: Selection::First,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Item service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ItemsConfig {
    /// Backing resource URI template; `{id}` is replaced by the requested item.
    pub resource_uri: String,

    /// Logical name of the counter service.
    pub counter_service: String,

    /// Counter key incremented per item request. Defaults to the service name.
    pub counter_key: Option<String>,

    /// Optional message merged into every item response.
    pub message: Option<String>,
}

impl Default for ItemsConfig {
    fn default() -> Self {
        Self {
            resource_uri: "http://127.0.0.1:9000/items/{id}".to_string(),
            counter_service: "counter".to_string(),
            counter_key: None,
            message: None,
        }
    }
}

/// Timeout configuration for inbound requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty or JSON log lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
