//! tx-relay - transaction-signing relay for Ethereum-family networks
//!
//! Derives one HD signing key from a seed phrase, allocates nonces from
//! a persistent Postgres counter, prices transactions with a cached
//! gas-price oracle, signs, and broadcasts to the configured networks.

use anyhow::Result;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

mod api;
mod chain;
mod config;
mod error;
mod metrics;
mod relay;
mod tx;
mod vault;

use chain::NetworkRegistry;
use config::Settings;
use metrics::MetricsServer;
use relay::RelayService;
use tx::{GasPriceOracle, NonceAllocator};
use vault::KeyVault;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    info!("Starting tx-relay v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load()?;
    info!(
        "Loaded configuration for {} networks",
        settings.networks.len()
    );

    // Derive the signing key before anything touches the network
    let vault = Arc::new(KeyVault::from_phrase(&settings.wallet.seed_phrase)?);
    info!("Relay signing address: {:?}", vault.address());

    let nonces = Arc::new(NonceAllocator::connect(&settings.database).await?);
    nonces.ensure_schema().await?;
    info!("Nonce store ready");

    let registry = Arc::new(NetworkRegistry::from_settings(&settings)?);
    let gas = Arc::new(GasPriceOracle::new());

    let service = Arc::new(RelayService::new(registry, vault, nonces, gas));

    let metrics_handle = if settings.metrics.enabled {
        let server = MetricsServer::new(settings.metrics.port);
        Some(tokio::spawn(async move {
            if let Err(e) = server.run().await {
                error!("Metrics server error: {}", e);
            }
        }))
    } else {
        None
    };

    let api_handle = tokio::spawn({
        let api_config = settings.api.clone();
        let service = service.clone();
        async move {
            if let Err(e) = api::run_server(api_config, service).await {
                error!("API server error: {}", e);
            }
        }
    });

    info!(
        "tx-relay is running on http://{}:{}",
        settings.api.host, settings.api.port
    );
    if settings.metrics.enabled {
        info!("Metrics: http://0.0.0.0:{}/metrics", settings.metrics.port);
    }

    shutdown_signal().await;

    info!("Shutdown signal received, stopping...");

    api_handle.abort();
    if let Some(h) = metrics_handle {
        h.abort();
    }

    info!("tx-relay stopped");
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tx_relay=debug,sqlx=warn,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
