//! Prometheus metrics for monitoring
//!
//! Exposes metrics for:
//! - Relay request volume and failures
//! - Nonce allocation and broadcast counts
//! - Gas price reads and fallbacks

use crate::error::RelayResult;

use axum::{routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge_vec, CounterVec, Encoder, GaugeVec, TextEncoder,
};
use std::net::SocketAddr;
use tracing::info;

lazy_static! {
    pub static ref RELAYS_RECEIVED: CounterVec = register_counter_vec!(
        "tx_relay_requests_total",
        "Total relay requests received",
        &["network"]
    )
    .unwrap();

    pub static ref RELAYS_FAILED: CounterVec = register_counter_vec!(
        "tx_relay_requests_failed_total",
        "Total relay requests failed by error kind",
        &["network", "kind"]
    )
    .unwrap();

    pub static ref TX_SUBMITTED: CounterVec = register_counter_vec!(
        "tx_relay_transactions_submitted_total",
        "Total signed transactions broadcast",
        &["network"]
    )
    .unwrap();

    pub static ref NONCES_ALLOCATED: CounterVec = register_counter_vec!(
        "tx_relay_nonces_allocated_total",
        "Total nonces allocated",
        &["network"]
    )
    .unwrap();

    pub static ref GAS_PRICE_FALLBACKS: CounterVec = register_counter_vec!(
        "tx_relay_gas_price_fallbacks_total",
        "Total gas price reads served from the cache or default",
        &["network"]
    )
    .unwrap();

    pub static ref GAS_PRICE_WEI: GaugeVec = register_gauge_vec!(
        "tx_relay_gas_price_wei",
        "Last observed gas price per network",
        &["network"]
    )
    .unwrap();
}

/// Prometheus metrics server
pub struct MetricsServer {
    port: u16,
}

impl MetricsServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub async fn run(&self) -> RelayResult<()> {
        let app = Router::new().route("/metrics", get(metrics_handler));

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        info!("Starting metrics server on {}", addr);

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| crate::error::RelayError::Internal(e.to_string()))?;
        axum::serve(listener, app)
            .await
            .map_err(|e| crate::error::RelayError::Internal(e.to_string()))?;

        Ok(())
    }
}

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

// Helper functions to record metrics

pub fn record_relay_received(network: &str) {
    RELAYS_RECEIVED.with_label_values(&[network]).inc();
}

pub fn record_relay_failed(network: &str, kind: &str) {
    RELAYS_FAILED.with_label_values(&[network, kind]).inc();
}

pub fn record_tx_submitted(network: &str) {
    TX_SUBMITTED.with_label_values(&[network]).inc();
}

pub fn record_nonce_allocated(network: &str) {
    NONCES_ALLOCATED.with_label_values(&[network]).inc();
}

pub fn record_gas_fallback(network: &str) {
    GAS_PRICE_FALLBACKS.with_label_values(&[network]).inc();
}

pub fn record_gas_price(network: &str, wei: f64) {
    GAS_PRICE_WEI.with_label_values(&[network]).set(wei);
}
