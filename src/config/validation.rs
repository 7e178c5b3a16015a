//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ratios, windows, durations > 0)
//! - Detect malformed or conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: MeshConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{MeshConfig, RegistryMode, Role};

/// A single semantic problem found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &MeshConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.service.name.trim().is_empty() {
        errors.push(ValidationError::new("service.name", "must not be empty"));
    }
    if config.service.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "service.bind_address",
            format!("'{}' is not a socket address", config.service.bind_address),
        ));
    }

    let breaker = &config.breaker;
    if breaker.window_size == 0 {
        errors.push(ValidationError::new("breaker.window_size", "must be greater than 0"));
    }
    if !(breaker.failure_threshold_ratio > 0.0 && breaker.failure_threshold_ratio <= 1.0) {
        errors.push(ValidationError::new(
            "breaker.failure_threshold_ratio",
            "must be in (0, 1]",
        ));
    }
    let minimum = breaker.minimum_calls();
    if minimum == 0 || minimum > breaker.window_size {
        errors.push(ValidationError::new(
            "breaker.minimum_calls",
            "must be between 1 and window_size",
        ));
    }
    if breaker.open_duration_ms == 0 {
        errors.push(ValidationError::new("breaker.open_duration_ms", "must be greater than 0"));
    }
    if breaker.call_timeout_ms == 0 {
        errors.push(ValidationError::new("breaker.call_timeout_ms", "must be greater than 0"));
    }
    if breaker.window_duration_ms == Some(0) {
        errors.push(ValidationError::new("breaker.window_duration_ms", "must be greater than 0"));
    }

    let registry = &config.registry;
    if registry.mode == RegistryMode::Remote {
        match registry.url.as_deref().map(url::Url::parse) {
            Some(Ok(_)) => {}
            Some(Err(e)) => errors.push(ValidationError::new("registry.url", e.to_string())),
            None => errors.push(ValidationError::new("registry.url", "required in remote mode")),
        }
    }
    if registry.heartbeat_interval_secs == 0 {
        errors.push(ValidationError::new(
            "registry.heartbeat_interval_secs",
            "must be greater than 0",
        ));
    }
    // Leases are suspended at half the TTL, so a live instance must
    // heartbeat more often than that.
    if registry.lease_ttl_secs <= registry.heartbeat_interval_secs.saturating_mul(2) {
        errors.push(ValidationError::new(
            "registry.lease_ttl_secs",
            "must exceed twice heartbeat_interval_secs",
        ));
    }
    for (i, instance) in registry.instances.iter().enumerate() {
        if instance.name.trim().is_empty() || instance.address.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("registry.instances[{}]", i),
                "name and address are required",
            ));
        }
    }

    let mut seen = HashSet::new();
    for (i, route) in config.routes.iter().enumerate() {
        let field = format!("routes[{}]", i);
        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.prefix", field),
                "must start with '/'",
            ));
        }
        if !seen.insert(route.prefix.trim_end_matches('/').to_string()) {
            errors.push(ValidationError::new(
                format!("{}.prefix", field),
                format!("duplicate prefix '{}'", route.prefix),
            ));
        }
        if route.service.trim().is_empty() {
            errors.push(ValidationError::new(
                format!("{}.service", field),
                "must not be empty",
            ));
        }
    }

    if config.service.role == Role::Items {
        if !config.items.resource_uri.contains("{id}") {
            errors.push(ValidationError::new(
                "items.resource_uri",
                "must contain an {id} placeholder",
            ));
        } else if url::Url::parse(&config.items.resource_uri.replace("{id}", "0")).is_err() {
            errors.push(ValidationError::new("items.resource_uri", "is not a valid URI"));
        }
        if config.items.counter_service.trim().is_empty() {
            errors.push(ValidationError::new("items.counter_service", "must not be empty"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "is not a socket address",
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::RouteConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&MeshConfig::default()).is_ok());
    }

    #[test]
    fn test_reports_every_problem() {
        let mut config = MeshConfig::default();
        config.breaker.window_size = 0;
        config.breaker.failure_threshold_ratio = 1.5;
        config.registry.mode = RegistryMode::Remote;
        config.routes.push(RouteConfig {
            prefix: "api".into(),
            service: "".into(),
            strip_prefix: true,
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"breaker.window_size"));
        assert!(fields.contains(&"breaker.failure_threshold_ratio"));
        assert!(fields.contains(&"breaker.minimum_calls"));
        assert!(fields.contains(&"registry.url"));
        assert!(fields.contains(&"routes[0].prefix"));
        assert!(fields.contains(&"routes[0].service"));
    }

    #[test]
    fn test_duplicate_prefixes_rejected() {
        let mut config = MeshConfig::default();
        for prefix in ["/gateway/m1", "/gateway/m1/"] {
            config.routes.push(RouteConfig {
                prefix: prefix.into(),
                service: "m1-service".into(),
                strip_prefix: true,
            });
        }
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "routes[1].prefix");
    }

    #[test]
    fn test_lease_ttl_must_cover_two_heartbeats() {
        let mut config = MeshConfig::default();
        config.registry.heartbeat_interval_secs = 10;

        config.registry.lease_ttl_secs = 15;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "registry.lease_ttl_secs");

        config.registry.lease_ttl_secs = 20;
        assert!(validate_config(&config).is_err());

        config.registry.lease_ttl_secs = 21;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_items_role_needs_placeholder() {
        let mut config = MeshConfig::default();
        config.service.role = Role::Items;
        config.items.resource_uri = "http://127.0.0.1:9000/items".into();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "items.resource_uri");
    }
}
