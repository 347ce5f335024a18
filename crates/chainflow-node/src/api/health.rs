//! Health and registry info endpoints.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Registry info response.
#[derive(Serialize)]
pub struct InfoResponse {
    pub network: String,
    pub chain_id: u64,
    pub supported_tokens: Vec<String>,
    pub supported_pairs: Vec<String>,
}

/// Supported tokens and trading pairs.
pub async fn registry_info(State(state): State<AppState>) -> Json<InfoResponse> {
    let network = state.registry.network();
    Json(InfoResponse {
        network: network.name.clone(),
        chain_id: network.chain_id,
        supported_tokens: state.registry.supported_tokens(),
        supported_pairs: state.registry.supported_pairs(),
    })
}
