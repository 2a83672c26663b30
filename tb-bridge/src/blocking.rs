//! Blocking wrapper around [`Client`](crate::Client).
//!
//! For callers without an async runtime. The wrapper owns a small tokio
//! runtime that drives the session's background tasks; every call blocks the
//! calling thread until the async call finishes. Do not use it from inside a
//! tokio runtime.

use std::sync::Arc;

use tokio::runtime::{Builder, Runtime};

use crate::client::{Client, ClientBuilder};
use crate::error::{ClientError, Result};
use crate::protocol::{Account, CreateResult, Identifier, Record, Transfer};

/// Synchronous ledger client.
pub struct BlockingClient {
    client: Arc<Client>,
    runtime: Runtime,
}

impl BlockingClient {
    /// Connect to a cluster with default settings.
    pub fn connect(cluster: impl Into<Identifier>, addresses: &str) -> Result<Self> {
        Self::build(Client::builder().cluster(cluster).addresses(addresses)?)
    }

    /// Build a client from a configured builder.
    pub fn build(builder: ClientBuilder) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("tb-bridge-blocking")
            .enable_all()
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to start runtime: {}", e)))?;
        let client = runtime.block_on(builder.build())?;
        Ok(Self {
            client: Arc::new(client),
            runtime,
        })
    }

    /// The async client behind this wrapper.
    pub fn inner(&self) -> &Arc<Client> {
        &self.client
    }

    /// See [`Client::create_accounts`].
    pub fn create_accounts(&self, accounts: &[Account]) -> Result<Vec<CreateResult>> {
        self.runtime.block_on(self.client.create_accounts(accounts))
    }

    /// See [`Client::create_transfers`].
    pub fn create_transfers(&self, transfers: &[Transfer]) -> Result<Vec<CreateResult>> {
        self.runtime.block_on(self.client.create_transfers(transfers))
    }

    /// See [`Client::lookup_accounts`].
    pub fn lookup_accounts(&self, ids: &[Identifier]) -> Result<Vec<Account>> {
        self.runtime.block_on(self.client.lookup_accounts(ids))
    }

    /// See [`Client::lookup_transfers`].
    pub fn lookup_transfers(&self, ids: &[Identifier]) -> Result<Vec<Transfer>> {
        self.runtime.block_on(self.client.lookup_transfers(ids))
    }

    /// See [`Client::max_batch_count`].
    pub fn max_batch_count<R: Record>(&self) -> usize {
        self.client.max_batch_count::<R>()
    }

    /// Close the session and stop the runtime.
    pub fn close(self) {
        self.runtime.block_on(self.client.close());
    }
}

impl std::fmt::Debug for BlockingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockingClient")
            .field("client", &self.client)
            .finish()
    }
}
