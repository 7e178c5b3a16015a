//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::MeshConfig;
use crate::config::validation::validate_config;
use crate::error::ConfigError;

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<MeshConfig, ConfigError> {
    let config: MeshConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<MeshConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config = parse_config(&content)?;

    if config.service.config_uri == MeshConfig::default().service.config_uri {
        config.service.config_uri = format!("file://{}", path.display());
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::Role;

    #[test]
    fn test_parse_gateway_config() {
        let config = parse_config(
            r#"
            [service]
            name = "gateway"
            role = "gateway"
            bind_address = "127.0.0.1:8099"

            [registry]
            mode = "remote"
            url = "http://127.0.0.1:8761"

            [[routes]]
            prefix = "/gateway/m1"
            service = "m1-service"
            "#,
        )
        .unwrap();

        assert_eq!(config.service.role, Role::Gateway);
        assert_eq!(config.routes.len(), 1);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = parse_config(
            r#"
            [breaker]
            failure_threshold_ratio = 0.0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_syntax_error_is_parse_error() {
        let result = parse_config("[service\nname = ");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_deploy_configs_are_valid() {
        for content in [
            include_str!("../../deploy/registry.toml"),
            include_str!("../../deploy/m1-items.toml"),
            include_str!("../../deploy/m2-items.toml"),
            include_str!("../../deploy/m3-counter.toml"),
            include_str!("../../deploy/gateway.toml"),
        ] {
            parse_config(content).unwrap();
        }
    }

    #[test]
    fn test_load_sets_config_uri() {
        let path = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/deploy/gateway.toml"));
        let config = load_config(path).unwrap();
        assert_eq!(config.service.config_uri, format!("file://{}", path.display()));
        assert_eq!(config.routes.len(), 3);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_config(Path::new("/definitely/not/here.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
