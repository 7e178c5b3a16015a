//! Background lease maintenance.
//!
//! # Responsibilities
//! - `Registrar`: register this process at startup (with backoff), heartbeat
//!   periodically, deregister on shutdown
//! - `LeaseReaper`: periodically suspend/expire late leases in the registry role

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time;

use crate::registry::client::RegistryClient;
use crate::registry::instance::ServiceInstance;
use crate::registry::table::InstanceTable;
use crate::resilience::backoff::calculate_backoff;

const REGISTER_BASE_DELAY_MS: u64 = 200;
const REGISTER_MAX_DELAY_MS: u64 = 5_000;

/// Keeps this process's own registration alive.
pub struct Registrar {
    registry: Arc<RegistryClient>,
    instance: ServiceInstance,
    interval: Duration,
}

impl Registrar {
    pub fn new(registry: Arc<RegistryClient>, instance: ServiceInstance, interval: Duration) -> Self {
        Self {
            registry,
            instance,
            interval,
        }
    }

    /// Register, heartbeat until shutdown, then deregister.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.registry.register(&self.instance).await {
                Ok(()) => {
                    tracing::info!(instance = %self.instance, "Registered with registry");
                    break;
                }
                Err(e) => {
                    let delay = calculate_backoff(attempt, REGISTER_BASE_DELAY_MS, REGISTER_MAX_DELAY_MS);
                    tracing::warn!(
                        instance = %self.instance,
                        attempt,
                        delay = ?delay,
                        error = %e,
                        "Registration failed, retrying"
                    );
                    tokio::select! {
                        _ = time::sleep(delay) => {}
                        _ = shutdown.recv() => return,
                    }
                }
            }
        }

        let mut ticker = time::interval(self.interval);
        // First tick completes immediately; registration just happened.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.registry.register(&self.instance).await {
                        tracing::warn!(instance = %self.instance, error = %e, "Heartbeat failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!(instance = %self.instance, "Registrar received shutdown signal");
                    break;
                }
            }
        }

        match self.registry.deregister(&self.instance).await {
            Ok(()) => tracing::info!(instance = %self.instance, "Deregistered from registry"),
            Err(e) => tracing::warn!(instance = %self.instance, error = %e, "Deregistration failed"),
        }
    }
}

/// Sweeps the authoritative table for late heartbeats.
pub struct LeaseReaper {
    table: Arc<InstanceTable>,
    interval: Duration,
}

impl LeaseReaper {
    pub fn new(table: Arc<InstanceTable>, interval: Duration) -> Self {
        Self { table, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Lease reaper starting");
        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.table.reap();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Lease reaper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
