//! Edge terminator daemon.
//!
//! Resolves the environment's configuration set, compiles the route table,
//! loads TLS material, and serves until SIGINT/SIGTERM. Configuration
//! problems are fatal before any traffic is accepted; route changes require
//! a restart.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use shipgate::config::{Environment, ShipConfig};
use shipgate::http::EdgeServer;
use shipgate::lifecycle::shutdown_signal;
use shipgate::net::load_tls_config;
use shipgate::observability::{logging, metrics};
use shipgate::routing::RouteTable;

const CONFIG_DIR_VAR: &str = "SHIPGATE_CONFIG_DIR";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let environment = Environment::from_env()?;
    let config_dir =
        PathBuf::from(std::env::var(CONFIG_DIR_VAR).unwrap_or_else(|_| "config".to_string()));

    let config: ShipConfig = shipgate::config::resolve(environment, &config_dir)?;

    logging::init(&config.observability.log_level);

    tracing::info!(
        environment = %environment,
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        database_url = %config.database.redacted_url(),
        "shipgate edge starting"
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

    let routes = Arc::new(RouteTable::compile(&config.routes)?);
    let server = EdgeServer::new(&config, routes);

    match &config.listener.tls {
        Some(tls) => {
            // Fatal if the material is missing or unreadable: the edge
            // never starts degraded.
            let rustls = load_tls_config(
                std::path::Path::new(&tls.cert_path),
                std::path::Path::new(&tls.key_path),
            )
            .await?;
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            server.run_tls(addr, rustls, shutdown_signal()).await?;
        }
        None => {
            tracing::warn!("TLS not configured; serving plaintext (dev only)");
            let listener = tokio::net::TcpListener::bind(&config.listener.bind_address).await?;
            server.run(listener, shutdown_signal()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
