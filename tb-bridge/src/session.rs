//! One transport to one cluster, with its correlator and in-flight limit.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::batch::Batch;
use crate::config::ClientConfig;
use crate::correlator::{Correlator, PendingHandle};
use crate::error::{ClientError, Result};
use crate::event::{Event, EventSink};
use crate::transport::{self, Request, Transport, TransportKind};

/// A live session.
///
/// Sessions never reconnect; once [`is_usable`](Self::is_usable) turns false
/// the owner opens a new one.
pub struct Session {
    transport: Arc<dyn Transport>,
    correlator: Arc<Correlator>,
    slots: Arc<Semaphore>,
    sink: Arc<dyn EventSink>,
    request_timeout: Duration,
    batch_size: usize,
    reaper: JoinHandle<()>,
}

impl Session {
    /// Open the configured transport and start the expiry sweep.
    pub async fn open(config: &ClientConfig, sink: Arc<dyn EventSink>) -> Result<Self> {
        let correlator = Arc::new(Correlator::new(Arc::clone(&sink)));
        let client_id = crate::id();
        let transport =
            transport::open(config, client_id, Arc::clone(&correlator), Arc::clone(&sink)).await?;

        let batch_size = match transport.batch_size_limit() {
            Some(limit) => config.max_batch_size.min(limit as usize),
            None => config.max_batch_size,
        };
        sink.record(Event::Connected {
            transport: transport.kind(),
            batch_size,
        });

        let reaper = tokio::spawn(reap(Arc::downgrade(&correlator), config.reap_interval));

        Ok(Self {
            transport,
            correlator,
            slots: Arc::new(Semaphore::new(config.max_outstanding)),
            sink,
            request_timeout: config.request_timeout,
            batch_size,
            reaper,
        })
    }

    /// Send one batch and return the handle to await its reply.
    ///
    /// Waits for a free in-flight slot first; that wait counts against the
    /// request timeout.
    pub async fn submit(&self, batch: Batch) -> Result<PendingHandle> {
        let permit = tokio::time::timeout(
            self.request_timeout,
            Arc::clone(&self.slots).acquire_owned(),
        )
        .await
        .map_err(|_| ClientError::Timeout)?
        .map_err(|_| ClientError::Shutdown)?;

        let handle = self
            .correlator
            .register(batch.operation, self.request_timeout, Some(permit))?;
        self.sink.record(Event::BatchSubmitted {
            operation: batch.operation,
            tag: handle.tag(),
            count: batch.count,
        });

        let sent = self
            .transport
            .send(Request {
                tag: handle.tag(),
                operation: batch.operation,
                payload: batch.payload,
            })
            .await;
        match sent {
            Ok(()) => Ok(handle),
            Err(error) => {
                // Never reached the wire, so no reply can come back for it.
                handle.discard();
                Err(error)
            }
        }
    }

    /// Returns false once the transport broke or the session was closed.
    pub fn is_usable(&self) -> bool {
        self.transport.is_usable() && !self.correlator.is_closed()
    }

    /// Maximum encoded batch size for this session.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Transport kind of this session.
    pub fn transport_kind(&self) -> TransportKind {
        self.transport.kind()
    }

    /// Requests currently in flight.
    pub fn outstanding(&self) -> usize {
        self.correlator.outstanding()
    }

    /// Shut the transport down and fail anything in flight.
    pub async fn close(&self) {
        self.reaper.abort();
        self.slots.close();
        self.transport.close().await;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reaper.abort();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("transport", &self.transport.kind())
            .field("batch_size", &self.batch_size)
            .field("outstanding", &self.outstanding())
            .finish()
    }
}

async fn reap(correlator: Weak<Correlator>, every: Duration) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        let Some(correlator) = correlator.upgrade() else {
            return;
        };
        let removed = correlator.remove_expired(Instant::now());
        if removed > 0 {
            tracing::debug!(removed, "swept expired requests");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::BatchBuilder;
    use crate::protocol::{Identifier, Operation};
    use crate::testing::{FakeServer, RecordingSink};

    fn config(address: String) -> ClientConfig {
        ClientConfig {
            addresses: vec![address],
            request_timeout: Duration::from_secs(2),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_open_uses_advertised_limit() {
        let server = FakeServer::builder().batch_size_limit(4096).start().await;
        let sink = Arc::new(RecordingSink::default());
        let session = Session::open(&config(server.address()), sink.clone())
            .await
            .unwrap();

        assert_eq!(session.batch_size(), 4096);
        assert_eq!(session.transport_kind(), TransportKind::Stream);
        assert!(session.is_usable());
        assert!(sink.events().contains(&Event::Connected {
            transport: TransportKind::Stream,
            batch_size: 4096,
        }));
    }

    #[tokio::test]
    async fn test_submit_and_wait() {
        let server = FakeServer::builder().start().await;
        let session = Session::open(&config(server.address()), Arc::new(RecordingSink::default()))
            .await
            .unwrap();

        let batches = BatchBuilder::new(session.batch_size())
            .build(Operation::LookupAccounts, &[Identifier::new(0, 1)])
            .unwrap();
        let handle = session.submit(batches[0].clone()).await.unwrap();
        assert_eq!(handle.tag(), 1);
        // Nothing was created, so the lookup finds nothing.
        assert!(handle.wait().await.unwrap().is_empty());
        assert_eq!(session.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_close_fails_submits() {
        let server = FakeServer::builder().start().await;
        let session = Session::open(&config(server.address()), Arc::new(RecordingSink::default()))
            .await
            .unwrap();
        session.close().await;
        assert!(!session.is_usable());

        let batch = BatchBuilder::new(session.batch_size())
            .build(Operation::LookupAccounts, &[Identifier::new(0, 1)])
            .unwrap()
            .remove(0);
        assert!(session.submit(batch).await.is_err());
    }

    #[tokio::test]
    async fn test_reaper_times_out_silent_requests() {
        let server = FakeServer::builder()
            .silent(Operation::LookupTransfers)
            .start()
            .await;
        let sink = Arc::new(RecordingSink::default());
        let session = Session::open(
            &ClientConfig {
                request_timeout: Duration::from_millis(50),
                reap_interval: Duration::from_millis(10),
                ..config(server.address())
            },
            sink.clone(),
        )
        .await
        .unwrap();

        let batch = BatchBuilder::new(session.batch_size())
            .build(Operation::LookupTransfers, &[Identifier::new(0, 7)])
            .unwrap()
            .remove(0);
        let handle = session.submit(batch).await.unwrap();
        assert_eq!(handle.wait().await, Err(ClientError::Timeout));
        assert_eq!(session.outstanding(), 0);
        assert!(session.is_usable());
    }
}
