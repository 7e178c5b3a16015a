//! Registry backends: where the authoritative instance set lives.
//!
//! # Design Decisions
//! - `EmbeddedRegistry` serves the table held by this process (the registry
//!   role, tests, and statically seeded meshes)
//! - `RemoteRegistry` talks to a registry server over HTTP with a short timeout
//! - Callers normally go through `RegistryClient`, which adds the resolution cache

use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::error::RegistryError;
use crate::registry::instance::{Registration, ServiceInstance};
use crate::registry::table::InstanceTable;

/// Source of truth for service membership.
#[async_trait]
pub trait RegistryBackend: Send + Sync + std::fmt::Debug {
    /// Register or refresh an instance.
    async fn register(&self, instance: &ServiceInstance) -> Result<(), RegistryError>;

    /// Remove an instance.
    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), RegistryError>;

    /// Healthy instances for a logical name.
    async fn resolve(&self, logical_name: &str) -> Result<Vec<ServiceInstance>, RegistryError>;
}

/// Backend over an in-process table.
#[derive(Debug, Clone)]
pub struct EmbeddedRegistry {
    table: Arc<InstanceTable>,
}

impl EmbeddedRegistry {
    pub fn new(table: Arc<InstanceTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<InstanceTable> {
        &self.table
    }
}

#[async_trait]
impl RegistryBackend for EmbeddedRegistry {
    async fn register(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        self.table.register(&instance.logical_name, &instance.address);
        Ok(())
    }

    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        self.table.deregister(&instance.logical_name, &instance.address);
        Ok(())
    }

    async fn resolve(&self, logical_name: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        Ok(self.table.resolve(logical_name))
    }
}

/// Backend over a registry server's HTTP surface.
#[derive(Debug, Clone)]
pub struct RemoteRegistry {
    base_url: String,
    client: reqwest::Client,
}

impl RemoteRegistry {
    /// Create a client for the registry at `base_url` with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn instances_url(&self) -> String {
        format!("{}/registry/instances", self.base_url)
    }
}

fn check_status(status: StatusCode) -> Result<(), RegistryError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(RegistryError::Status(status.as_u16()))
    }
}

#[async_trait]
impl RegistryBackend for RemoteRegistry {
    async fn register(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        let response = self
            .client
            .post(self.instances_url())
            .json(&Registration::from(instance))
            .send()
            .await?;
        check_status(response.status())
    }

    async fn deregister(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        let mut url = url::Url::parse(&self.instances_url())
            .map_err(|e| RegistryError::Unreachable(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RegistryError::Unreachable("registry url cannot be a base".into()))?
            .push(&instance.logical_name)
            .push(&instance.address);

        let response = self.client.delete(url).send().await?;
        // Unknown instance is already the desired state.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        check_status(response.status())
    }

    async fn resolve(&self, logical_name: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
        let mut url = url::Url::parse(&format!("{}/registry/services", self.base_url))
            .map_err(|e| RegistryError::Unreachable(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| RegistryError::Unreachable("registry url cannot be a base".into()))?
            .push(logical_name);

        let response = self.client.get(url).send().await?;
        check_status(response.status())?;
        let instances: Vec<ServiceInstance> = response.json().await?;
        Ok(instances.into_iter().filter(|i| i.healthy).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_embedded_round_trip() {
        let registry = EmbeddedRegistry::new(Arc::new(InstanceTable::new(Duration::from_secs(30))));
        let instance = ServiceInstance::new("m3", "127.0.0.1:9003");

        registry.register(&instance).await.unwrap();
        assert_eq!(registry.resolve("m3").await.unwrap(), vec![instance.clone()]);

        registry.deregister(&instance).await.unwrap();
        assert!(registry.resolve("m3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remote_unreachable_is_error() {
        // Port 9 (discard) is not listening on loopback in test environments.
        let registry = RemoteRegistry::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let result = registry.resolve("m3").await;
        assert!(matches!(result, Err(RegistryError::Unreachable(_))));
    }
}
