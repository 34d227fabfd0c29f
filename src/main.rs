//! Outbound resilience gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!   inbound request
//!       → http::server (Axum, request ID, tracing)
//!       → routing::resolver (path prefix → mapping)
//!       → resilience::breaker (fail fast while open)
//!       → resilience::rate_limit (fixed-window admission)
//!       → forward::forwarder (upstream call, redirects, timeout)
//!       → resilience::breaker (record outcome)
//!       → response to caller
//!
//!   coordination state: store::{memory, sqlite} via compare-and-swap
//!   configuration: config::{loader, validation, watcher} + ArcSwap
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use egress_gateway::config::loader::load_config;
use egress_gateway::config::watcher::ConfigWatcher;
use egress_gateway::config::StoreBackendKind;
use egress_gateway::store::{Backend, MemoryStore, SqliteStore};
use egress_gateway::{GatewayConfig, GatewayServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "egress-gateway", about = "Outbound resilience proxy")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "egress_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => {
            tracing::warn!("No --config given, starting with defaults (no mappings)");
            GatewayConfig::default()
        }
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        mappings = config.mappings.len(),
        store = ?config.store.backend,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => egress_gateway::observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = match config.store.backend {
        StoreBackendKind::Memory => Backend::Memory(MemoryStore::new()),
        StoreBackendKind::Sqlite => {
            Backend::Sqlite(SqliteStore::connect(&config.store.sqlite_path).await?)
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = GatewayServer::new(config, store);

    // Hot reload: validated config changes swap in for the next request.
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let handle = server.config_handle();
            tokio::spawn(async move {
                while let Some(new_config) = updates.recv().await {
                    handle.store(Arc::new(new_config));
                    tracing::info!("Configuration swapped");
                }
            });
            Some(watcher.run()?)
        }
        None => None,
    };

    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
