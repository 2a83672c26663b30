//! Observability hook.
//!
//! The client reports what it does through an [`EventSink`] chosen at build
//! time. The default [`TracingSink`] turns events into `tracing` records; use
//! [`NoopSink`] to discard them or implement the trait to feed metrics.

use std::time::Duration;

use crate::error::ClientError;
use crate::protocol::Operation;
use crate::transport::TransportKind;

/// Something the client did or observed.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A batch was registered with the correlator and handed to the transport.
    BatchSubmitted {
        /// Operation of the batch.
        operation: Operation,
        /// Correlation tag assigned to the batch.
        tag: u32,
        /// Number of records in the batch.
        count: u32,
    },
    /// A frame was written to the transport.
    FrameSent {
        /// Operation of the frame.
        operation: Operation,
        /// Correlation tag.
        tag: u32,
        /// Payload size in bytes.
        bytes: usize,
    },
    /// A reply frame was read and matched to a pending request.
    FrameReceived {
        /// Operation of the reply.
        operation: Operation,
        /// Correlation tag.
        tag: u32,
        /// Payload size in bytes.
        bytes: usize,
        /// Time since the request was submitted.
        elapsed: Duration,
    },
    /// A reply arrived for a tag nobody is waiting on; it was dropped.
    LateReply {
        /// Correlation tag of the dropped reply.
        tag: u32,
    },
    /// A pending request passed its deadline.
    Timeout {
        /// Operation of the request.
        operation: Operation,
        /// Correlation tag.
        tag: u32,
    },
    /// A session-level failure.
    Error {
        /// The error.
        error: ClientError,
    },
    /// A new session was opened.
    Connected {
        /// Transport used by the session.
        transport: TransportKind,
        /// Batch size in effect for the session.
        batch_size: usize,
    },
}

/// Receiver of client events.
///
/// Called inline on the client's hot paths; implementations must not block.
pub trait EventSink: Send + Sync {
    /// Record one event.
    fn record(&self, event: Event);
}

/// Sink that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {
    fn record(&self, _: Event) {}
}

/// Sink that emits `tracing` events under the `tb_bridge` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: Event) {
        match event {
            Event::BatchSubmitted {
                operation,
                tag,
                count,
            } => tracing::debug!(%operation, tag, count, "batch submitted"),
            Event::FrameSent {
                operation,
                tag,
                bytes,
            } => tracing::trace!(%operation, tag, bytes, "frame sent"),
            Event::FrameReceived {
                operation,
                tag,
                bytes,
                elapsed,
            } => tracing::debug!(
                %operation,
                tag,
                bytes,
                elapsed_us = elapsed.as_micros() as u64,
                "frame received"
            ),
            Event::LateReply { tag } => tracing::warn!(tag, "dropping reply for unknown tag"),
            Event::Timeout { operation, tag } => {
                tracing::warn!(%operation, tag, "request timed out")
            }
            Event::Error { error } => tracing::error!(%error, "session error"),
            Event::Connected {
                transport,
                batch_size,
            } => tracing::info!(?transport, batch_size, "session established"),
        }
    }
}
