//! Transports that carry framed requests to the ledger.
//!
//! A transport is opened for one session and delivers every reply to that
//! session's [`Correlator`]. The session never sees how: the stream transport
//! runs a reader task, the HTTP transport answers inline from the call that
//! sent the request, and the native transport forwards completion callbacks
//! through a channel.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ClientConfig;
use crate::correlator::Correlator;
use crate::error::{ClientError, Result};
use crate::event::EventSink;
use crate::protocol::{Identifier, Operation};

#[cfg(feature = "http")]
pub mod http;
pub mod native;
pub mod stream;

#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use native::{
    AcquireStatus, CompletionFn, NativeClient, NativeLibrary, NativePacket, NativeTransport,
};
pub use stream::StreamTransport;

/// Which transport a client uses.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum TransportKind {
    /// Persistent TCP connection with binary frames.
    #[default]
    Stream,
    /// One HTTP POST with a JSON body per batch.
    Http,
    /// Callback-driven native client library.
    Native,
}

impl TransportKind {
    /// Lowercase name, as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            TransportKind::Stream => "stream",
            TransportKind::Http => "http",
            TransportKind::Native => "native",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stream" | "tcp" => Ok(TransportKind::Stream),
            "http" => Ok(TransportKind::Http),
            "native" => Ok(TransportKind::Native),
            other => Err(format!("unknown transport '{}'", other)),
        }
    }
}

/// A request handed to a transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    /// Correlation tag registered with the correlator.
    pub tag: u32,
    /// Operation of the batch.
    pub operation: Operation,
    /// Encoded records.
    pub payload: Vec<u8>,
}

/// Transport interface used by a session.
///
/// Implementations deliver replies (or per-request failures) to the
/// correlator they were opened with. A failure that breaks the transport must
/// also mark it unusable and fail every request in flight on it.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Which kind of transport this is.
    fn kind(&self) -> TransportKind;

    /// Send one request.
    ///
    /// An `Err` means the request was not delivered; the caller still owns
    /// its pending entry.
    async fn send(&self, request: Request) -> Result<()>;

    /// Returns false once the transport can no longer carry requests.
    fn is_usable(&self) -> bool;

    /// Batch size limit advertised by the peer, if any.
    fn batch_size_limit(&self) -> Option<u32>;

    /// Stop the transport and fail whatever is still in flight.
    async fn close(&self);
}

/// Open the transport selected by `config`.
pub async fn open(
    config: &ClientConfig,
    client_id: Identifier,
    correlator: Arc<Correlator>,
    sink: Arc<dyn EventSink>,
) -> Result<Arc<dyn Transport>> {
    match config.transport {
        TransportKind::Stream => {
            let transport = StreamTransport::connect(config, client_id, correlator, sink).await?;
            Ok(Arc::new(transport))
        }
        #[cfg(feature = "http")]
        TransportKind::Http => Ok(Arc::new(HttpTransport::new(config, correlator, sink)?)),
        #[cfg(not(feature = "http"))]
        TransportKind::Http => Err(ClientError::Validation(
            "HTTP transport requires the `http` feature".into(),
        )),
        TransportKind::Native => {
            let library = config.native_library.clone().ok_or_else(|| {
                ClientError::Validation("native transport requires a native library".into())
            })?;
            let transport = NativeTransport::connect(library.as_ref(), config, correlator, sink)?;
            Ok(Arc::new(transport))
        }
    }
}
