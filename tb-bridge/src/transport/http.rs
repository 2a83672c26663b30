//! HTTP/JSON transport.
//!
//! Each batch becomes `POST http://<address>/<operation>` with a JSON array
//! body and is answered inline, so there is no read loop: the reply is decoded,
//! re-encoded to the binary record layout and handed to the correlator before
//! `send` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Request, Transport, TransportKind};
use crate::config::ClientConfig;
use crate::correlator::{Correlator, Reply};
use crate::error::{ClientError, ProtocolError, Result};
use crate::event::{Event, EventSink};
use crate::protocol::{
    decode_all, encode_all, Account, CreateResult, Identifier, Operation, Record, Transfer,
};

/// JSON over HTTP, one request per batch.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    open: AtomicBool,
    correlator: Arc<Correlator>,
    sink: Arc<dyn EventSink>,
}

impl HttpTransport {
    /// Create a transport posting to the first configured address.
    pub fn new(
        config: &ClientConfig,
        correlator: Arc<Correlator>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        let address = config
            .addresses
            .first()
            .ok_or_else(|| ClientError::Validation("no addresses provided".into()))?;
        let base_url = if address.starts_with("http://") || address.starts_with("https://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{}", address)
        };
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            open: AtomicBool::new(true),
            correlator,
            sink,
        })
    }

    /// URL a given operation is posted to.
    pub fn url(&self, operation: Operation) -> String {
        format!("{}/{}", self.base_url, operation.endpoint())
    }

    async fn call(&self, operation: Operation, payload: &[u8]) -> Result<Vec<u8>> {
        match operation {
            Operation::CreateAccounts => {
                self.post::<Account, CreateResult>(operation, payload).await
            }
            Operation::CreateTransfers => {
                self.post::<Transfer, CreateResult>(operation, payload).await
            }
            Operation::LookupAccounts => {
                self.post::<Identifier, Account>(operation, payload).await
            }
            Operation::LookupTransfers => {
                self.post::<Identifier, Transfer>(operation, payload).await
            }
            Operation::Register => Err(ProtocolError::InvalidOperation.into()),
        }
    }

    async fn post<E, R>(&self, operation: Operation, payload: &[u8]) -> Result<Vec<u8>>
    where
        E: Record + Serialize,
        R: Record + DeserializeOwned,
    {
        let events: Vec<E> = decode_all(payload)?;
        let url = self.url(operation);

        let response = self
            .http
            .post(&url)
            .json(&events)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Transport(format!(
                "{} returned {}: {}",
                url,
                status,
                body.trim()
            )));
        }

        let results: Vec<R> = response.json().await.map_err(request_error)?;
        Ok(encode_all(&results))
    }
}

fn request_error(e: reqwest::Error) -> ClientError {
    if e.is_timeout() {
        ClientError::Timeout
    } else if e.is_decode() {
        ClientError::Transport(format!("invalid response body: {}", e))
    } else {
        ClientError::Transport(e.to_string())
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Http
    }

    async fn send(&self, request: Request) -> Result<()> {
        if !self.is_usable() {
            return Err(ClientError::Shutdown);
        }
        self.sink.record(Event::FrameSent {
            operation: request.operation,
            tag: request.tag,
            bytes: request.payload.len(),
        });
        let payload = self.call(request.operation, &request.payload).await?;
        self.correlator
            .on_frame_received(request.tag, Reply::ok(request.operation, payload));
        Ok(())
    }

    fn is_usable(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn batch_size_limit(&self) -> Option<u32> {
        None
    }

    async fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.correlator.fail_all(ClientError::Shutdown);
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}
