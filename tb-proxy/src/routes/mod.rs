//! HTTP route handlers.

pub mod accounts;
pub mod transfers;

use crate::api::HealthResponse;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let ledger_connected = state.client.is_connected().await;

    Json(HealthResponse {
        status: "ok".to_string(),
        ledger_connected,
    })
}
