//! Mesh process entry point.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────┐
//!                    │   registry   │◀──── register / heartbeat / resolve
//!                    └──────────────┘
//!                           ▲
//!     Client ──▶ gateway ───┼──▶ items (m1, m2) ───▶ counter (m3)
//!                   │       │         │
//!                   └───────┴─────────┴──▶ resource
//!
//!     Every arrow leaving a process goes through the resilient invoker
//!     (one circuit breaker per remote service, fallback on failure).
//! ```
//!
//! One binary serves every role; `--role` (or `service.role`) picks which.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use mesh_gateway::config::loader::load_config;
use mesh_gateway::config::validation::validate_config;
use mesh_gateway::config::{MeshConfig, Role};
use mesh_gateway::error::ConfigError;
use mesh_gateway::lifecycle::{wait_for_signal, Shutdown};
use mesh_gateway::observability::{logging, metrics};
use mesh_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "mesh-gateway")]
#[command(about = "Service mesh process: registry, counter, items or gateway", long_about = None)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `service.role`.
    #[arg(short, long)]
    role: Option<Role>,

    /// Override `service.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn resolve_config(args: &Args) -> Result<MeshConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => MeshConfig::default(),
    };
    if let Some(role) = args.role {
        config.service.role = role;
    }
    if let Some(bind) = &args.bind {
        config.service.bind_address = bind.clone();
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = resolve_config(&args)?;

    logging::init(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service.name,
        role = %config.service.role,
        "mesh-gateway starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.service.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    server_task.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}
