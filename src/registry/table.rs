//! Authoritative instance table with heartbeat leases.
//!
//! # Responsibilities
//! - Hold every registered instance grouped by logical name
//! - Refresh leases on re-registration (idempotent register)
//! - Suspend instances whose heartbeat is late, remove expired ones
//!
//! # Lease States
//! ```text
//! register/heartbeat → healthy
//! heartbeat age > ttl/2 → unhealthy (excluded from resolve)
//! heartbeat age > ttl → removed
//! ```

use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::time::Instant;

use crate::observability::metrics;
use crate::registry::instance::ServiceInstance;

#[derive(Debug, Clone)]
struct Lease {
    last_heartbeat: Instant,
    healthy: bool,
}

/// Outcome of one reaping pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReapReport {
    /// Instances marked unhealthy during this pass.
    pub suspended: Vec<ServiceInstance>,
    /// Instances removed during this pass.
    pub expired: Vec<ServiceInstance>,
}

/// Registry-side storage of instance leases.
#[derive(Debug)]
pub struct InstanceTable {
    services: DashMap<String, HashMap<String, Lease>>,
    lease_ttl: Duration,
}

impl InstanceTable {
    pub fn new(lease_ttl: Duration) -> Self {
        Self {
            services: DashMap::new(),
            lease_ttl,
        }
    }

    /// Register or refresh an instance. Returns true if it was not known before.
    pub fn register(&self, name: &str, address: &str) -> bool {
        let mut leases = self.services.entry(name.to_string()).or_default();
        let lease = Lease {
            last_heartbeat: Instant::now(),
            healthy: true,
        };
        let is_new = leases.insert(address.to_string(), lease).is_none();
        let count = leases.len();
        drop(leases);

        if is_new {
            tracing::info!(service = %name, address = %address, "Instance registered");
            metrics::record_registry_size(name, count);
        } else {
            tracing::trace!(service = %name, address = %address, "Lease refreshed");
        }
        is_new
    }

    /// Remove an instance immediately. Returns true if it existed.
    pub fn deregister(&self, name: &str, address: &str) -> bool {
        let removed = match self.services.get_mut(name) {
            Some(mut leases) => {
                let removed = leases.remove(address).is_some();
                metrics::record_registry_size(name, leases.len());
                removed
            }
            None => false,
        };
        self.services.remove_if(name, |_, leases| leases.is_empty());

        if removed {
            tracing::info!(service = %name, address = %address, "Instance deregistered");
        }
        removed
    }

    /// Healthy instances of a logical service.
    pub fn resolve(&self, name: &str) -> Vec<ServiceInstance> {
        let Some(leases) = self.services.get(name) else {
            return Vec::new();
        };
        let mut instances: Vec<ServiceInstance> = leases
            .iter()
            .filter(|(_, lease)| lease.healthy)
            .map(|(address, _)| ServiceInstance::new(name, address.clone()))
            .collect();
        instances.sort_by(|a, b| a.address.cmp(&b.address));
        instances
    }

    /// Every known instance, healthy or not, grouped by logical name.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<ServiceInstance>> {
        let mut out = BTreeMap::new();
        for entry in self.services.iter() {
            let mut instances: Vec<ServiceInstance> = entry
                .value()
                .iter()
                .map(|(address, lease)| ServiceInstance {
                    logical_name: entry.key().clone(),
                    address: address.clone(),
                    healthy: lease.healthy,
                })
                .collect();
            instances.sort_by(|a, b| a.address.cmp(&b.address));
            out.insert(entry.key().clone(), instances);
        }
        out
    }

    /// Suspend late leases and drop expired ones.
    pub fn reap(&self) -> ReapReport {
        let now = Instant::now();
        let suspend_after = self.lease_ttl / 2;
        let mut report = ReapReport::default();

        self.services.retain(|name, leases| {
            leases.retain(|address, lease| {
                let age = now.saturating_duration_since(lease.last_heartbeat);
                if age > self.lease_ttl {
                    report.expired.push(ServiceInstance {
                        logical_name: name.clone(),
                        address: address.clone(),
                        healthy: false,
                    });
                    return false;
                }
                if age > suspend_after && lease.healthy {
                    lease.healthy = false;
                    report.suspended.push(ServiceInstance {
                        logical_name: name.clone(),
                        address: address.clone(),
                        healthy: false,
                    });
                }
                true
            });
            metrics::record_registry_size(name, leases.len());
            !leases.is_empty()
        });

        for instance in &report.suspended {
            tracing::warn!(instance = %instance, "Heartbeat late, instance suspended");
        }
        for instance in &report.expired {
            tracing::warn!(instance = %instance, "Lease expired, instance removed");
        }
        report
    }

    /// Number of known instances across all services.
    pub fn len(&self) -> usize {
        self.services.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_idempotent() {
        let table = InstanceTable::new(Duration::from_secs(30));
        assert!(table.register("m3", "10.0.0.1:8080"));
        assert!(!table.register("m3", "10.0.0.1:8080"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve("m3"), vec![ServiceInstance::new("m3", "10.0.0.1:8080")]);
    }

    #[test]
    fn test_many_instances_per_name() {
        let table = InstanceTable::new(Duration::from_secs(30));
        table.register("m3", "10.0.0.2:8080");
        table.register("m3", "10.0.0.1:8080");
        table.register("m1", "10.0.0.3:8080");

        let resolved = table.resolve("m3");
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].address, "10.0.0.1:8080");
        assert!(table.resolve("unknown").is_empty());
    }

    #[test]
    fn test_deregister_removes_immediately() {
        let table = InstanceTable::new(Duration::from_secs(30));
        table.register("m3", "a:1");
        assert!(table.deregister("m3", "a:1"));
        assert!(!table.deregister("m3", "a:1"));
        assert!(table.resolve("m3").is_empty());
        assert!(table.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_heartbeat_suspends_then_expires() {
        let table = InstanceTable::new(Duration::from_secs(10));
        table.register("m3", "a:1");
        table.register("m3", "b:1");

        tokio::time::advance(Duration::from_secs(6)).await;
        table.register("m3", "b:1");
        let report = table.reap();
        assert_eq!(report.suspended.len(), 1);
        assert_eq!(report.suspended[0].address, "a:1");
        assert_eq!(table.resolve("m3").len(), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        let report = table.reap();
        assert_eq!(report.expired.len(), 1);
        assert_eq!(report.expired[0].address, "a:1");
        assert_eq!(table.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_restores_suspended_instance() {
        let table = InstanceTable::new(Duration::from_secs(10));
        table.register("m3", "a:1");
        tokio::time::advance(Duration::from_secs(6)).await;
        table.reap();
        assert!(table.resolve("m3").is_empty());

        table.register("m3", "a:1");
        assert_eq!(table.resolve("m3").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instance_heartbeating_within_half_ttl_stays_resolvable() {
        // Smallest TTL the config accepts for a 10s heartbeat.
        let table = InstanceTable::new(Duration::from_secs(21));
        table.register("m3", "a:1");

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(9)).await;
            table.reap();
            assert_eq!(table.resolve("m3").len(), 1);
            tokio::time::advance(Duration::from_secs(1)).await;
            table.reap();
            assert_eq!(table.resolve("m3").len(), 1);
            table.register("m3", "a:1");
        }
    }
}
