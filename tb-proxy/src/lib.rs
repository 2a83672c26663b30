//! tb-proxy: HTTP/JSON gateway in front of a ledger cluster.
//!
//! Every endpoint takes a JSON array of records (or ids) and answers with a
//! JSON array, forwarding the batch through one shared [`tb_bridge::Client`].

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use state::AppState;

/// Build the router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/create_accounts", post(routes::accounts::create_accounts))
        .route("/lookup_accounts", post(routes::accounts::lookup_accounts))
        .route("/create_transfers", post(routes::transfers::create_transfers))
        .route("/lookup_transfers", post(routes::transfers::lookup_transfers))
        .route("/health", get(routes::health))
        // State
        .with_state(state)
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

/// Serve the router on `listener` until the task is dropped.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<()> {
    axum::serve(listener, router(state)).await
}
