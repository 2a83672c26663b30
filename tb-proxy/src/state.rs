//! Application state management.

use std::sync::Arc;

use tb_bridge::{Client, ClientError};

use crate::config::Config;

/// Shared application state.
pub struct AppState {
    /// Ledger client, shared by every request.
    pub client: Client,
    /// Application configuration.
    pub config: Config,
}

impl AppState {
    /// Create new application state and connect to the ledger.
    pub async fn new(config: Config) -> Result<Arc<Self>, ClientError> {
        tracing::info!(
            addresses = ?config.ledger_addresses,
            transport = %config.transport,
            "connecting to ledger"
        );

        let client = Client::builder()
            .cluster(config.cluster_id)
            .addresses_vec(config.ledger_addresses.clone())
            .transport(config.transport)
            .request_timeout(config.request_timeout)
            .build()
            .await?;

        tracing::info!(batch_size = client.batch_size(), "connected");

        Ok(Self::with_client(client, config))
    }

    /// Wrap an already connected client.
    pub fn with_client(client: Client, config: Config) -> Arc<Self> {
        Arc::new(Self { client, config })
    }
}
