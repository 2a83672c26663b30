//! Account route handlers.

use crate::error::AppError;
use crate::state::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tb_bridge::{Account, CreateResult, Identifier};

/// Create accounts; answers with the failures.
pub async fn create_accounts(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<Account>>, JsonRejection>,
) -> Result<Json<Vec<CreateResult>>, AppError> {
    let Json(accounts) = body?;
    tracing::debug!(count = accounts.len(), "create_accounts");
    let results = state.client.create_accounts(&accounts).await?;
    Ok(Json(results))
}

/// Look up accounts by id.
pub async fn lookup_accounts(
    State(state): State<Arc<AppState>>,
    body: Result<Json<Vec<Identifier>>, JsonRejection>,
) -> Result<Json<Vec<Account>>, AppError> {
    let Json(ids) = body?;
    let accounts = state.client.lookup_accounts(&ids).await?;
    Ok(Json(accounts))
}
