//! Ledger client.
//!
//! [`Client`] turns record slices into batches, sends them over its current
//! session and gathers the replies in input order.
//!
//! # Example
//!
//! ```ignore
//! use tb_bridge::{Account, Client};
//!
//! let client = Client::connect(0, "127.0.0.1:3000").await?;
//!
//! let account = Account {
//!     id: tb_bridge::id(),
//!     ledger: 1,
//!     code: 1,
//!     ..Default::default()
//! };
//! let errors = client.create_accounts(&[account]).await?;
//! assert!(errors.is_empty());
//!
//! client.close().await;
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::sync::RwLock;

use crate::batch::{Batch, BatchBuilder};
use crate::config::{parse_addresses, ClientConfig};
use crate::error::{ClientError, ProtocolError, Result};
use crate::event::{EventSink, TracingSink};
use crate::protocol::{
    decode_all, Account, CreateResult, Identifier, Operation, Record, Transfer,
};
use crate::session::Session;
use crate::transport::{NativeLibrary, TransportKind};

/// Ledger client.
///
/// `Client` is `Send + Sync`; share it through an `Arc` and call it from as
/// many tasks as needed. Each call gets its own correlation tags, so
/// concurrent calls only ever see their own results.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use tb_bridge::Client;
///
/// let client = Client::builder()
///     .cluster(0)
///     .addresses("127.0.0.1:3000,127.0.0.1:3001")?
///     .request_timeout(Duration::from_secs(2))
///     .build()
///     .await?;
/// ```
pub struct Client {
    config: ClientConfig,
    sink: Arc<dyn EventSink>,
    session: RwLock<Option<Arc<Session>>>,
    batch_size: AtomicUsize,
    closed: AtomicBool,
}

impl Client {
    /// Connect to a cluster with default settings.
    ///
    /// # Arguments
    ///
    /// * `cluster` - Cluster id
    /// * `addresses` - Comma-separated addresses, e.g. `"127.0.0.1:3000"`
    pub async fn connect(cluster: impl Into<Identifier>, addresses: &str) -> Result<Self> {
        Self::builder()
            .cluster(cluster)
            .addresses(addresses)?
            .build()
            .await
    }

    /// Create a client builder for custom configuration.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Validate `config` and open the first session.
    pub async fn with_config(config: ClientConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        config.validate()?;
        let session = Session::open(&config, Arc::clone(&sink)).await?;
        Ok(Self {
            batch_size: AtomicUsize::new(session.batch_size()),
            config,
            sink,
            session: RwLock::new(Some(Arc::new(session))),
            closed: AtomicBool::new(false),
        })
    }

    /// Configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Batch size in effect for the most recent session.
    pub fn batch_size(&self) -> usize {
        self.batch_size.load(Ordering::Relaxed)
    }

    /// How many records of kind `R` fit in one batch.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let max_accounts = client.max_batch_count::<Account>();
    /// let max_ids = client.max_batch_count::<Identifier>();
    /// ```
    pub fn max_batch_count<R: Record>(&self) -> usize {
        BatchBuilder::new(self.batch_size()).records_per_batch::<R>()
    }

    /// Returns true if the current session can carry requests.
    pub async fn is_connected(&self) -> bool {
        match self.session.read().await.as_ref() {
            Some(session) => session.is_usable(),
            None => false,
        }
    }

    /// Create accounts.
    ///
    /// Returns one entry per account the ledger did not accept, with `index`
    /// pointing into `accounts`. An empty result means every account was
    /// created.
    pub async fn create_accounts(&self, accounts: &[Account]) -> Result<Vec<CreateResult>> {
        check_ids(accounts.iter().map(|a| a.id))?;
        self.create(Operation::CreateAccounts, accounts).await
    }

    /// Create transfers.
    ///
    /// Returns one entry per transfer the ledger did not accept, with `index`
    /// pointing into `transfers`.
    pub async fn create_transfers(&self, transfers: &[Transfer]) -> Result<Vec<CreateResult>> {
        check_ids(transfers.iter().map(|t| t.id))?;
        self.create(Operation::CreateTransfers, transfers).await
    }

    /// Look up accounts by id. Ids that do not exist are absent from the
    /// result.
    pub async fn lookup_accounts(&self, ids: &[Identifier]) -> Result<Vec<Account>> {
        self.lookup(Operation::LookupAccounts, ids).await
    }

    /// Look up transfers by id.
    pub async fn lookup_transfers(&self, ids: &[Identifier]) -> Result<Vec<Transfer>> {
        self.lookup(Operation::LookupTransfers, ids).await
    }

    /// Close the client and its session.
    ///
    /// Calls still in flight fail with [`ClientError::Shutdown`]; later calls
    /// fail the same way.
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let session = self.session.write().await.take();
        if let Some(session) = session {
            session.close().await;
        }
    }

    async fn create<E: Record>(
        &self,
        operation: Operation,
        events: &[E],
    ) -> Result<Vec<CreateResult>> {
        let replies = self.execute::<E, CreateResult>(operation, events).await?;
        let mut results = Vec::new();
        for (batch, batch_results) in replies {
            for mut result in batch_results {
                if result.index >= batch.count {
                    return Err(ProtocolError::UnexpectedPayload.into());
                }
                result.index += batch.offset;
                results.push(result);
            }
        }
        Ok(results)
    }

    async fn lookup<R: Record>(&self, operation: Operation, ids: &[Identifier]) -> Result<Vec<R>> {
        let replies = self.execute::<Identifier, R>(operation, ids).await?;
        let mut results = Vec::new();
        for (batch, batch_results) in replies {
            if batch_results.len() > batch.count as usize {
                return Err(ProtocolError::UnexpectedPayload.into());
            }
            results.extend(batch_results);
        }
        Ok(results)
    }

    /// Send every batch of `events` and return the decoded replies in batch
    /// order.
    async fn execute<E: Record, R: Record>(
        &self,
        operation: Operation,
        events: &[E],
    ) -> Result<Vec<(BatchInfo, Vec<R>)>> {
        if events.is_empty() {
            return Err(ClientError::Validation(format!(
                "{} requires at least one record",
                operation
            )));
        }
        let session = self.session().await?;
        let batches = BatchBuilder::new(session.batch_size()).build(operation, events)?;

        let calls = batches.into_iter().map(|batch| {
            let session = &session;
            async move {
                let info = BatchInfo::from(&batch);
                let payload = session.submit(batch).await?.wait().await?;
                Ok::<_, ClientError>((info, decode_all::<R>(&payload)?))
            }
        });

        let result = try_join_all(calls).await;
        if let Err(error) = &result {
            if error.is_fatal_to_session() {
                tracing::warn!(%operation, %error, "session failed");
            }
        }
        result
    }

    /// Current session, reopened if it broke and `reconnect` is on.
    async fn session(&self) -> Result<Arc<Session>> {
        if let Some(session) = self.session.read().await.as_ref() {
            if session.is_usable() {
                return Ok(Arc::clone(session));
            }
        }

        let mut slot = self.session.write().await;
        if self.closed.load(Ordering::Acquire) {
            return Err(ClientError::Shutdown);
        }
        if let Some(session) = slot.as_ref() {
            // Another caller may have reopened it while we waited.
            if session.is_usable() {
                return Ok(Arc::clone(session));
            }
            if !self.config.reconnect {
                return Err(ClientError::Transport("session is not usable".into()));
            }
        }
        if let Some(old) = slot.take() {
            old.close().await;
        }

        tracing::info!(transport = %self.config.transport, "opening new session");
        let session = Arc::new(Session::open(&self.config, Arc::clone(&self.sink)).await?);
        self.batch_size
            .store(session.batch_size(), Ordering::Relaxed);
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("batch_size", &self.batch_size())
            .finish()
    }
}

#[derive(Clone, Copy, Debug)]
struct BatchInfo {
    offset: u32,
    count: u32,
}

impl From<&Batch> for BatchInfo {
    fn from(batch: &Batch) -> Self {
        Self {
            offset: batch.offset,
            count: batch.count,
        }
    }
}

fn check_ids(ids: impl Iterator<Item = Identifier>) -> Result<()> {
    for (index, id) in ids.enumerate() {
        if id.is_zero() {
            return Err(ClientError::Validation(format!(
                "record {} has a zero id",
                index
            )));
        }
    }
    Ok(())
}

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for creating a [`Client`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// let client = Client::builder()
///     .cluster(0)
///     .addresses("127.0.0.1:3000,127.0.0.1:3001")?
///     .connect_timeout(Duration::from_secs(10))
///     .max_outstanding(64)
///     .build()
///     .await?;
/// ```
pub struct ClientBuilder {
    config: ClientConfig,
    sink: Arc<dyn EventSink>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            sink: Arc::new(TracingSink),
        }
    }

    /// Set the cluster id.
    pub fn cluster(mut self, id: impl Into<Identifier>) -> Self {
        self.config.cluster = id.into();
        self
    }

    /// Set addresses from a comma-separated string.
    pub fn addresses(mut self, addrs: &str) -> Result<Self> {
        self.config.addresses = parse_addresses(addrs)?;
        Ok(self)
    }

    /// Set addresses from a vector.
    pub fn addresses_vec(mut self, addrs: Vec<String>) -> Self {
        self.config.addresses = addrs;
        self
    }

    /// Choose the transport.
    pub fn transport(mut self, kind: TransportKind) -> Self {
        self.config.transport = kind;
        self
    }

    /// Use a native client library; also selects the native transport.
    pub fn native_library(mut self, library: Arc<dyn NativeLibrary>) -> Self {
        self.config.native_library = Some(library);
        self.config.transport = TransportKind::Native;
        self
    }

    /// Set the maximum number of requests in flight per session.
    pub fn max_outstanding(mut self, max: usize) -> Self {
        self.config.max_outstanding = max;
        self
    }

    /// Set the per-request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Set the connection and handshake timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the maximum encoded batch size in bytes.
    pub fn max_batch_size(mut self, bytes: usize) -> Self {
        self.config.max_batch_size = bytes;
        self
    }

    /// Enable or disable opening a new session after a failure.
    pub fn reconnect(mut self, reconnect: bool) -> Self {
        self.config.reconnect = reconnect;
        self
    }

    /// Set how often expired requests are swept.
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.config.reap_interval = interval;
        self
    }

    /// Set the event sink. Defaults to [`TracingSink`].
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Build the client.
    ///
    /// This validates the configuration and opens the first session.
    pub async fn build(self) -> Result<Client> {
        Client::with_config(self.config, self.sink).await
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeServer;

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new();
        assert_eq!(builder.config().cluster, Identifier::ZERO);
        assert!(builder.config().addresses.is_empty());
        assert_eq!(builder.config().connect_timeout, Duration::from_secs(5));
        assert_eq!(builder.config().transport, TransportKind::Stream);
    }

    #[test]
    fn test_builder_addresses_empty() {
        let result = ClientBuilder::new().addresses("");
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_addresses_invalid() {
        let result = ClientBuilder::new().addresses("not-an-address");
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_addresses_valid() {
        let builder = ClientBuilder::new()
            .addresses("127.0.0.1:3000,127.0.0.1:3001")
            .unwrap();
        assert_eq!(builder.config().addresses.len(), 2);
    }

    #[tokio::test]
    async fn test_build_without_addresses() {
        let err = ClientBuilder::new().build().await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_check_ids() {
        assert!(check_ids([Identifier::new(0, 1), Identifier::new(1, 0)].into_iter()).is_ok());
        let err = check_ids([Identifier::new(0, 1), Identifier::ZERO].into_iter()).unwrap_err();
        assert_eq!(err, ClientError::Validation("record 1 has a zero id".into()));
    }

    #[tokio::test]
    async fn test_invalid_input_sends_nothing() {
        let server = FakeServer::builder().start().await;
        let client = Client::connect(0u128, &server.address()).await.unwrap();

        let err = client.create_accounts(&[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        let err = client.lookup_transfers(&[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        let err = client
            .create_accounts(&[Account::default()])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));

        assert!(server.frames().is_empty());
    }

    #[tokio::test]
    async fn test_max_batch_count() {
        let server = FakeServer::builder().batch_size_limit(1024).start().await;
        let client = Client::connect(0u128, &server.address()).await.unwrap();
        assert_eq!(client.batch_size(), 1024);
        assert_eq!(client.max_batch_count::<Account>(), 8);
        assert_eq!(client.max_batch_count::<Identifier>(), 64);
    }

    #[tokio::test]
    async fn test_close_rejects_later_calls() {
        let server = FakeServer::builder().start().await;
        let client = Client::connect(0u128, &server.address()).await.unwrap();
        client.close().await;
        assert!(!client.is_connected().await);
        let err = client
            .lookup_accounts(&[Identifier::new(0, 1)])
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Shutdown);
    }
}
