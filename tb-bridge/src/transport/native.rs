//! Adapter for a callback-driven native client library.
//!
//! The library is a black box behind [`NativeLibrary`] and [`NativeClient`]:
//! initialize with a completion callback, acquire a packet, submit it, and
//! deinitialize. The callback may run on any thread the library owns. It only
//! pushes the finished packet into a channel; a forwarder task on the runtime
//! resolves the matching pending request and returns the packet to the pool.
//! No library state escapes this module.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Request, Transport, TransportKind};
use crate::config::ClientConfig;
use crate::correlator::{Correlator, Reply};
use crate::error::{ClientError, InitStatus, PacketStatus, Result};
use crate::event::{Event, EventSink};
use crate::protocol::Identifier;

/// A request slot owned by the native library.
///
/// `user_data` is opaque to the library and comes back unchanged with the
/// completion; the adapter stores the correlation tag in it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct NativePacket {
    /// Library-assigned slot number.
    pub slot: u32,
    /// Caller context returned with the completion.
    pub user_data: u64,
    /// Operation code.
    pub operation: u16,
    /// Completion status, set by the library.
    pub status: PacketStatus,
    /// Encoded request records.
    pub data: Vec<u8>,
}

/// Why a packet could not be acquired.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AcquireStatus {
    /// Every packet is in flight.
    ConcurrencyMaxExceeded,
    /// The client was deinitialized.
    Shutdown,
}

/// Completion callback: the finished packet and the reply payload.
pub type CompletionFn = Arc<dyn Fn(NativePacket, Vec<u8>) + Send + Sync>;

/// Entry point of a native client library.
pub trait NativeLibrary: Send + Sync {
    /// Create a client connected to `cluster` at `addresses`
    /// (comma-separated) with a pool of `packets_count` packets.
    fn init(
        &self,
        cluster: Identifier,
        addresses: &str,
        packets_count: u32,
        on_completion: CompletionFn,
    ) -> std::result::Result<Box<dyn NativeClient>, InitStatus>;
}

/// Handle returned by [`NativeLibrary::init`].
pub trait NativeClient: Send + Sync {
    /// Take a free packet from the pool.
    fn acquire_packet(&self) -> std::result::Result<NativePacket, AcquireStatus>;

    /// Submit a filled packet. Completion is reported through the callback.
    fn submit(&self, packet: NativePacket);

    /// Return a completed packet to the pool.
    fn release_packet(&self, packet: NativePacket);

    /// Shut the client down. Packets still in flight complete with
    /// [`PacketStatus::ClientShutdown`] or not at all.
    fn deinit(&self);
}

/// Transport over a [`NativeClient`].
pub struct NativeTransport {
    client: Arc<dyn NativeClient>,
    usable: AtomicBool,
    correlator: Arc<Correlator>,
    sink: Arc<dyn EventSink>,
    forwarder: JoinHandle<()>,
}

impl NativeTransport {
    /// Initialize the library and start the completion forwarder.
    pub fn connect(
        library: &dyn NativeLibrary,
        config: &ClientConfig,
        correlator: Arc<Correlator>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        let on_completion: CompletionFn = Arc::new(move |packet, result| {
            // The receiver is gone once the transport is closed.
            let _ = tx.send((packet, result));
        });

        let client: Arc<dyn NativeClient> = Arc::from(library.init(
            config.cluster,
            &config.addresses.join(","),
            config.max_outstanding as u32,
            on_completion,
        )?);

        let forwarder = tokio::spawn(forward_completions(
            rx,
            Arc::clone(&client),
            Arc::clone(&correlator),
        ));

        Ok(Self {
            client,
            usable: AtomicBool::new(true),
            correlator,
            sink,
            forwarder,
        })
    }
}

async fn forward_completions(
    mut rx: mpsc::UnboundedReceiver<(NativePacket, Vec<u8>)>,
    client: Arc<dyn NativeClient>,
    correlator: Arc<Correlator>,
) {
    while let Some((mut packet, result)) = rx.recv().await {
        let reply = Reply {
            operation: packet.operation,
            status: packet.status,
            payload: result,
        };
        let tag = packet.user_data as u32;
        // Return the packet before waking the caller so its next submit finds it free.
        packet.data.clear();
        client.release_packet(packet);
        correlator.on_frame_received(tag, reply);
    }
}

#[async_trait]
impl Transport for NativeTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Native
    }

    async fn send(&self, request: Request) -> Result<()> {
        if !self.is_usable() {
            return Err(ClientError::Shutdown);
        }
        let mut packet = self.client.acquire_packet().map_err(|status| match status {
            AcquireStatus::ConcurrencyMaxExceeded => {
                ClientError::Busy("native packet pool exhausted".into())
            }
            AcquireStatus::Shutdown => ClientError::Shutdown,
        })?;

        let bytes = request.payload.len();
        packet.user_data = request.tag as u64;
        packet.operation = request.operation.code();
        packet.status = PacketStatus::Ok;
        packet.data = request.payload;
        self.client.submit(packet);

        self.sink.record(Event::FrameSent {
            operation: request.operation,
            tag: request.tag,
            bytes,
        });
        Ok(())
    }

    fn is_usable(&self) -> bool {
        self.usable.load(Ordering::Acquire)
    }

    fn batch_size_limit(&self) -> Option<u32> {
        None
    }

    async fn close(&self) {
        if self.usable.swap(false, Ordering::AcqRel) {
            self.client.deinit();
        }
        self.forwarder.abort();
        self.correlator.fail_all(ClientError::Shutdown);
    }
}

impl Drop for NativeTransport {
    fn drop(&mut self) {
        if self.usable.swap(false, Ordering::AcqRel) {
            self.client.deinit();
        }
        self.forwarder.abort();
    }
}
