//! Service instance records.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One registered instance of a logical service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Stable cluster identifier shared by all instances of a service.
    pub logical_name: String,
    /// Network address (host:port).
    pub address: String,
    /// Whether the instance is currently eligible for traffic.
    pub healthy: bool,
}

impl ServiceInstance {
    /// A freshly registered instance is healthy.
    pub fn new(logical_name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            logical_name: logical_name.into(),
            address: address.into(),
            healthy: true,
        }
    }

    /// Identity of the instance within the registry.
    pub fn key(&self) -> (&str, &str) {
        (&self.logical_name, &self.address)
    }
}

impl fmt::Display for ServiceInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.logical_name, self.address)
    }
}

/// Wire form used by the registry server for register/heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub name: String,
    pub address: String,
}

impl From<&ServiceInstance> for Registration {
    fn from(instance: &ServiceInstance) -> Self {
        Self {
            name: instance.logical_name.clone(),
            address: instance.address.clone(),
        }
    }
}
