//! Caller-side registry access with a bounded-staleness resolution cache.
//!
//! # Responsibilities
//! - Register/deregister through the configured backend
//! - Resolve logical names, serving cached results younger than the staleness window
//! - Absorb backend failures: resolution never errors, it returns an empty list
//!
//! # Design Decisions
//! - Cache entries are replaced, never extended: an entry older than the window
//!   is always refetched, so a removed instance disappears within one window
//! - Local register/deregister invalidate the name's entry immediately
//! - A failed refresh drops the stale entry instead of serving it

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::RegistryError;
use crate::registry::backend::RegistryBackend;
use crate::registry::instance::ServiceInstance;

#[derive(Debug, Clone)]
struct CachedResolution {
    instances: Vec<ServiceInstance>,
    fetched_at: Instant,
}

/// Resolves logical service names to live instances.
#[derive(Debug)]
pub struct RegistryClient {
    backend: Arc<dyn RegistryBackend>,
    cache: DashMap<String, CachedResolution>,
    staleness: Duration,
    resolve_timeout: Duration,
}

impl RegistryClient {
    pub fn new(backend: Arc<dyn RegistryBackend>, staleness: Duration, resolve_timeout: Duration) -> Self {
        Self {
            backend,
            cache: DashMap::new(),
            staleness,
            resolve_timeout,
        }
    }

    /// Register an instance (refreshes its lease if already present).
    pub async fn register(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        self.backend.register(instance).await?;
        self.invalidate(&instance.logical_name);
        Ok(())
    }

    /// Remove an instance; subsequent resolves through this client exclude it.
    pub async fn deregister(&self, instance: &ServiceInstance) -> Result<(), RegistryError> {
        self.backend.deregister(instance).await?;
        self.invalidate(&instance.logical_name);
        Ok(())
    }

    /// Healthy instances for `logical_name`. Empty when none are healthy or
    /// the registry cannot be reached.
    pub async fn resolve(&self, logical_name: &str) -> Vec<ServiceInstance> {
        if let Some(cached) = self.cache.get(logical_name) {
            if cached.fetched_at.elapsed() < self.staleness {
                return cached.instances.clone();
            }
        }

        let fetched_at = Instant::now();
        match tokio::time::timeout(self.resolve_timeout, self.backend.resolve(logical_name)).await {
            Ok(Ok(instances)) => {
                let instances: Vec<ServiceInstance> =
                    instances.into_iter().filter(|i| i.healthy).collect();
                tracing::debug!(
                    service = %logical_name,
                    instances = instances.len(),
                    "Resolved service"
                );
                self.cache.insert(
                    logical_name.to_string(),
                    CachedResolution {
                        instances: instances.clone(),
                        fetched_at,
                    },
                );
                instances
            }
            Ok(Err(e)) => {
                tracing::warn!(service = %logical_name, error = %e, "Resolution failed");
                self.invalidate(logical_name);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(
                    service = %logical_name,
                    timeout_ms = self.resolve_timeout.as_millis() as u64,
                    "Resolution timed out"
                );
                self.invalidate(logical_name);
                Vec::new()
            }
        }
    }

    /// Drop any cached resolution for `logical_name`.
    pub fn invalidate(&self, logical_name: &str) {
        self.cache.remove(logical_name);
    }

    pub fn staleness(&self) -> Duration {
        self.staleness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::backend::EmbeddedRegistry;
    use crate::registry::table::InstanceTable;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RegistryBackend for CountingBackend {
        async fn register(&self, _: &ServiceInstance) -> Result<(), RegistryError> {
            Ok(())
        }

        async fn deregister(&self, _: &ServiceInstance) -> Result<(), RegistryError> {
            Ok(())
        }

        async fn resolve(&self, name: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                ServiceInstance::new(name, "a:1"),
                ServiceInstance {
                    logical_name: name.to_string(),
                    address: "b:1".into(),
                    healthy: false,
                },
            ])
        }
    }

    #[derive(Debug)]
    struct FailingBackend;

    #[async_trait]
    impl RegistryBackend for FailingBackend {
        async fn register(&self, _: &ServiceInstance) -> Result<(), RegistryError> {
            Err(RegistryError::Unreachable("down".into()))
        }

        async fn deregister(&self, _: &ServiceInstance) -> Result<(), RegistryError> {
            Err(RegistryError::Unreachable("down".into()))
        }

        async fn resolve(&self, _: &str) -> Result<Vec<ServiceInstance>, RegistryError> {
            Err(RegistryError::Status(500))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_serves_within_window() {
        let backend = Arc::new(CountingBackend::default());
        let client = RegistryClient::new(backend.clone(), Duration::from_secs(3), Duration::from_millis(500));

        let first = client.resolve("m3").await;
        assert_eq!(first, vec![ServiceInstance::new("m3", "a:1")]);
        client.resolve("m3").await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(3)).await;
        client.resolve("m3").await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_resolves_empty() {
        let client = RegistryClient::new(Arc::new(FailingBackend), Duration::from_secs(3), Duration::from_millis(500));
        assert!(client.resolve("m3").await.is_empty());
        assert!(client.register(&ServiceInstance::new("m3", "a:1")).await.is_err());
    }

    #[tokio::test]
    async fn test_local_deregister_invalidates() {
        let table = Arc::new(InstanceTable::new(Duration::from_secs(30)));
        let client = RegistryClient::new(
            Arc::new(EmbeddedRegistry::new(table.clone())),
            Duration::from_secs(60),
            Duration::from_millis(500),
        );
        let instance = ServiceInstance::new("m3", "127.0.0.1:1");

        client.register(&instance).await.unwrap();
        assert_eq!(client.resolve("m3").await, vec![instance.clone()]);

        client.deregister(&instance).await.unwrap();
        assert!(client.resolve("m3").await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_external_removal_visible_after_one_window() {
        let table = Arc::new(InstanceTable::new(Duration::from_secs(30)));
        let client = RegistryClient::new(
            Arc::new(EmbeddedRegistry::new(table.clone())),
            Duration::from_secs(2),
            Duration::from_millis(500),
        );
        table.register("m3", "a:1");
        assert_eq!(client.resolve("m3").await.len(), 1);

        // Removed behind the client's back: may linger for one window only.
        table.deregister("m3", "a:1");
        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(client.resolve("m3").await.is_empty());
    }
}
