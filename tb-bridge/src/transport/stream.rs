//! TCP stream transport.
//!
//! One connection per session. Callers only enqueue frames; a writer task owns
//! the write half and writes them one at a time, so a caller that gives up
//! mid-send can never leave half a frame on the socket. A reader task owns the
//! read half and hands every reply frame to the correlator. Any I/O or framing
//! error marks the transport unusable and fails everything in flight; the
//! transport never reconnects by itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{Request, Transport, TransportKind};
use crate::config::ClientConfig;
use crate::correlator::{Correlator, Reply};
use crate::error::{ClientError, PacketStatus, ProtocolError, Result};
use crate::event::{Event, EventSink};
use crate::internal::connection::{self, read_frame, write_frame};
use crate::protocol::{
    Identifier, Message, Operation, RegisterReply, RegisterRequest, RequestBuilder,
};

/// Frame waiting for the writer task.
struct Outgoing {
    message: Message,
    operation: Operation,
    tag: u32,
    bytes: usize,
}

/// Binary frames over one TCP connection.
pub struct StreamTransport {
    peer: String,
    outgoing: mpsc::UnboundedSender<Outgoing>,
    usable: Arc<AtomicBool>,
    batch_size_limit: Option<u32>,
    correlator: Arc<Correlator>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
}

impl StreamTransport {
    /// Connect, perform the handshake and start the reader and writer tasks.
    pub async fn connect(
        config: &ClientConfig,
        client_id: Identifier,
        correlator: Arc<Correlator>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let (mut stream, peer) =
            connection::connect(&config.addresses, config.connect_timeout).await?;

        let register = RegisterRequest::new(config.cluster, client_id).to_message();
        let reply = tokio::time::timeout(config.connect_timeout, async {
            write_frame(&mut stream, &register).await?;
            read_frame(&mut stream).await
        })
        .await
        .map_err(|_| ClientError::Transport("handshake timed out".into()))??;

        let header = reply.header();
        if header.operation != Operation::Register.code() || header.tag != 0 {
            return Err(ClientError::Protocol(ProtocolError::UnexpectedReply));
        }
        if header.packet_status() != PacketStatus::Ok {
            return Err(ClientError::Rejected(header.packet_status()));
        }
        let batch_size_limit = RegisterReply::decode(reply.body())?.batch_size_limit();
        tracing::debug!(%peer, ?batch_size_limit, "registered with ledger");

        let (read_half, write_half) = stream.into_split();
        let usable = Arc::new(AtomicBool::new(true));
        let reader = tokio::spawn(read_loop(
            read_half,
            Arc::clone(&correlator),
            Arc::clone(&sink),
            Arc::clone(&usable),
        ));
        let (outgoing, queue) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(
            write_half,
            queue,
            Arc::clone(&correlator),
            sink,
            Arc::clone(&usable),
        ));

        Ok(Self {
            peer,
            outgoing,
            usable,
            batch_size_limit,
            correlator,
            reader,
            writer,
        })
    }

    /// Address of the connected peer.
    pub fn peer(&self) -> &str {
        &self.peer
    }
}

fn fail(
    usable: &AtomicBool,
    correlator: &Correlator,
    sink: &Arc<dyn EventSink>,
    error: ClientError,
) {
    if usable.swap(false, Ordering::AcqRel) {
        sink.record(Event::Error {
            error: error.clone(),
        });
    }
    correlator.fail_all(error);
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut queue: mpsc::UnboundedReceiver<Outgoing>,
    correlator: Arc<Correlator>,
    sink: Arc<dyn EventSink>,
    usable: Arc<AtomicBool>,
) {
    while let Some(frame) = queue.recv().await {
        if let Err(error) = write_frame(&mut writer, &frame.message).await {
            fail(&usable, &correlator, &sink, error);
            return;
        }
        sink.record(Event::FrameSent {
            operation: frame.operation,
            tag: frame.tag,
            bytes: frame.bytes,
        });
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    correlator: Arc<Correlator>,
    sink: Arc<dyn EventSink>,
    usable: Arc<AtomicBool>,
) {
    loop {
        match read_frame(&mut reader).await {
            Ok(message) => {
                let header = *message.header();
                if !header.is_reply() {
                    tracing::warn!(tag = header.tag, "ignoring non-reply frame");
                    continue;
                }
                let reply = Reply {
                    operation: header.operation,
                    status: header.packet_status(),
                    payload: message.into_body(),
                };
                correlator.on_frame_received(header.tag, reply);
            }
            Err(error) => {
                fail(&usable, &correlator, &sink, error);
                return;
            }
        }
    }
}

#[async_trait]
impl Transport for StreamTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Stream
    }

    async fn send(&self, request: Request) -> Result<()> {
        if !self.is_usable() {
            return Err(ClientError::Transport("connection is not usable".into()));
        }
        let bytes = request.payload.len();
        let message = RequestBuilder::new(request.operation)
            .tag(request.tag)
            .body(request.payload)
            .build()?;

        self.outgoing
            .send(Outgoing {
                message,
                operation: request.operation,
                tag: request.tag,
                bytes,
            })
            .map_err(|_| ClientError::Transport("connection is not usable".into()))
    }

    fn is_usable(&self) -> bool {
        self.usable.load(Ordering::Acquire)
    }

    fn batch_size_limit(&self) -> Option<u32> {
        self.batch_size_limit
    }

    async fn close(&self) {
        self.usable.store(false, Ordering::Release);
        self.reader.abort();
        // Dropping the write half with the task shuts down the socket.
        self.writer.abort();
        self.correlator.fail_all(ClientError::Shutdown);
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

impl std::fmt::Debug for StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("peer", &self.peer)
            .field("usable", &self.is_usable())
            .finish()
    }
}
