//! HTTP API - the relay entrypoint plus health and status

use crate::config::ApiConfig;
use crate::error::{RelayError, RelayResult};
use crate::relay::{RelayRequest, RelayService};

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RelayService>,
}

/// Build the API router
pub fn router(service: Arc<RelayService>) -> Router {
    Router::new()
        .route("/relay", post(relay))
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { service })
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, service: Arc<RelayService>) -> RelayResult<()> {
    let app = router(service);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| RelayError::Internal(e.to_string()))?;

    Ok(())
}

/// Sign and broadcast one transaction
async fn relay(State(state): State<AppState>, Json(request): Json<RelayRequest>) -> Response {
    match state.service.relay(&request).await {
        Ok(tx_hash) => (
            StatusCode::OK,
            Json(RelaySuccess {
                status: "success",
                tx_hash,
            }),
        )
            .into_response(),
        Err(e) => {
            let code = StatusCode::from_u16(e.status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                code,
                Json(RelayFailure {
                    status: "error",
                    message: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// Health check endpoint - basic liveness
async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Relay status: signing address and its balance per network
async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    let balances = state
        .service
        .balances()
        .await
        .into_iter()
        .map(|b| NetworkStatus {
            network: b.network,
            balance_wei: b.balance.map(|v| v.to_string()),
        })
        .collect();

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        address: format!("{:?}", state.service.signer_address()),
        networks: balances,
    })
}

// Response types

#[derive(Serialize)]
struct RelaySuccess {
    status: &'static str,
    #[serde(rename = "txHash")]
    tx_hash: String,
}

#[derive(Serialize)]
struct RelayFailure {
    status: &'static str,
    message: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Serialize)]
struct StatusResponse {
    version: String,
    address: String,
    networks: Vec<NetworkStatus>,
}

#[derive(Serialize)]
struct NetworkStatus {
    network: String,
    balance_wei: Option<String>,
}
