//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the registry client and resilient invoker for this process
//! - Create the Axum router for the configured role
//! - Wire up middleware (tracing, timeouts, body limits, request ID)
//! - Spawn lease maintenance (registrar or reaper) next to the server
//! - Serve until shutdown

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{MeshConfig, RegistryMode, Role};
use crate::counter::{counter_router, CounterStore};
use crate::error::RegistryError;
use crate::gateway::GatewayRouter;
use crate::http::request::UuidRequestId;
use crate::http::status::{status_router, StatusInfo};
use crate::items::{items_router, ItemsService};
use crate::registry::handlers::registry_router;
use crate::registry::heartbeat::{LeaseReaper, Registrar};
use crate::registry::{EmbeddedRegistry, InstanceTable, RegistryBackend, RegistryClient, RemoteRegistry, ServiceInstance};
use crate::resilience::{HyperTransport, ResilientInvoker, Transport};
use crate::routing::RouteTable;

/// HTTP server for one mesh process.
pub struct HttpServer {
    router: Router,
    config: MeshConfig,
    registry: Arc<RegistryClient>,
    table: Option<Arc<InstanceTable>>,
}

impl HttpServer {
    /// Build a server using the real network transport.
    pub fn new(config: MeshConfig) -> Result<Self, RegistryError> {
        let transport = Arc::new(HyperTransport::new(config.gateway.max_body_bytes));
        Self::with_transport(config, transport)
    }

    /// Build a server whose outbound calls go through `transport`.
    pub fn with_transport(config: MeshConfig, transport: Arc<dyn Transport>) -> Result<Self, RegistryError> {
        let embedded = config.service.role == Role::Registry || config.registry.mode == RegistryMode::Embedded;
        let table = embedded.then(|| Arc::new(InstanceTable::new(config.registry.lease_ttl())));

        let backend: Arc<dyn RegistryBackend> = match &table {
            Some(table) => {
                for seed in &config.registry.instances {
                    table.register(&seed.name, &seed.address);
                }
                Arc::new(EmbeddedRegistry::new(table.clone()))
            }
            None => {
                let url = config
                    .registry
                    .url
                    .as_deref()
                    .ok_or_else(|| RegistryError::Unreachable("registry.url is not set".to_string()))?;
                Arc::new(RemoteRegistry::new(url, config.registry.resolve_timeout())?)
            }
        };
        let registry = Arc::new(RegistryClient::new(
            backend,
            config.registry.staleness(),
            config.registry.resolve_timeout(),
        ));
        let invoker = Arc::new(ResilientInvoker::new(
            config.service.name.as_str(),
            transport,
            config.breaker.clone(),
        ));

        let role_router = match config.service.role {
            Role::Registry => match &table {
                Some(table) => registry_router(table.clone()),
                None => Router::new(),
            },
            Role::Counter => counter_router(Arc::new(CounterStore::new())),
            Role::Items => items_router(Arc::new(ItemsService::new(
                config.service.name.as_str(),
                config.items.clone(),
                registry.clone(),
                invoker,
            ))),
            Role::Gateway => {
                let gateway = Arc::new(GatewayRouter::new(
                    RouteTable::from_config(&config.routes),
                    registry.clone(),
                    invoker,
                    config.gateway.selection,
                    config.gateway.max_body_bytes,
                ));
                Router::new().fallback(gateway_handler).with_state(gateway)
            }
        };

        let status = Arc::new(StatusInfo {
            message: config.service.message.clone(),
            config_uri: config.service.config_uri.clone(),
        });
        let router = Self::build_router(&config, status_router(status).merge(role_router));

        tracing::info!(
            service = %config.service.name,
            role = %config.service.role,
            registry_mode = if embedded { "embedded" } else { "remote" },
            "Server configured"
        );
        Ok(Self {
            router,
            config,
            registry,
            table,
        })
    }

    /// Wrap the role router in the shared middleware stack.
    #[allow(deprecated)]
    fn build_router(config: &MeshConfig, router: Router) -> Router {
        router
            .layer(RequestBodyLimitLayer::new(config.gateway.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// The router without a listener, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn registry(&self) -> &Arc<RegistryClient> {
        &self.registry
    }

    /// The local instance table, when this process holds one.
    pub fn table(&self) -> Option<&Arc<InstanceTable>> {
        self.table.as_ref()
    }

    pub fn config(&self) -> &MeshConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            service = %self.config.service.name,
            role = %self.config.service.role,
            "HTTP server starting"
        );

        let mut tasks = Vec::new();
        if self.config.service.role == Role::Registry {
            if let Some(table) = &self.table {
                let interval = (self.config.registry.lease_ttl() / 4).max(Duration::from_millis(100));
                let reaper = LeaseReaper::new(table.clone(), interval);
                tasks.push(tokio::spawn(reaper.run(shutdown.resubscribe())));
            }
        } else if self.config.registry.register_self {
            let instance = ServiceInstance::new(
                self.config.service.name.as_str(),
                advertised_address(&self.config, addr),
            );
            let registrar = Registrar::new(
                self.registry.clone(),
                instance,
                self.config.registry.heartbeat_interval(),
            );
            tasks.push(tokio::spawn(registrar.run(shutdown.resubscribe())));
        }

        let app = self.router.into_make_service();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining");
            })
            .await?;

        // The registrar deregisters on the same signal; let it finish.
        for task in tasks {
            let _ = task.await;
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Address to publish: the configured one, or the bound socket with a
/// wildcard IP replaced by loopback.
fn advertised_address(config: &MeshConfig, bound: SocketAddr) -> String {
    if let Some(advertise) = &config.service.advertise_address {
        return advertise.clone();
    }
    if bound.ip().is_unspecified() {
        format!("127.0.0.1:{}", bound.port())
    } else {
        bound.to_string()
    }
}

async fn gateway_handler(State(gateway): State<Arc<GatewayRouter>>, request: Request<Body>) -> Response {
    match gateway.route(request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
