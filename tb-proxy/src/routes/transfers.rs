//! Transfer route handlers.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tb_bridge::{CreateResult, Identifier, Transfer};

/// Create transfers; answers with the failures.
pub async fn create_transfers(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<Transfer>>, JsonRejection>,
) -> Result<Json<Vec<CreateResult>>, AppError> {
    let Json(transfers) = body?;
    tracing::debug!(count = transfers.len(), "create_transfers");
    let results = state.client.create_transfers(&transfers).await?;
    Ok(Json(results))
}

/// Look up transfers by id.
pub async fn lookup_transfers(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<Identifier>>, JsonRejection>,
) -> Result<Json<Vec<Transfer>>, AppError> {
    let Json(ids) = body?;
    let transfers = state.client.lookup_transfers(&ids).await?;
    Ok(Json(transfers))
}
