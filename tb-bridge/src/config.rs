//! Client configuration.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{ClientError, Result};
use crate::protocol::{Identifier, HEADER_SIZE, MESSAGE_SIZE_MAX};
use crate::transport::{NativeLibrary, TransportKind};

/// Default maximum number of requests in flight per session.
pub const DEFAULT_MAX_OUTSTANDING: usize = 32;

/// Default batch size: the largest payload a frame can carry.
pub const DEFAULT_MAX_BATCH_SIZE: usize = MESSAGE_SIZE_MAX as usize - HEADER_SIZE;

/// Everything a [`Client`](crate::Client) needs to open sessions.
///
/// Built with [`ClientBuilder`](crate::ClientBuilder); each client owns its
/// own copy.
#[derive(Clone)]
pub struct ClientConfig {
    /// Cluster the client talks to.
    pub cluster: Identifier,
    /// `host:port` addresses, tried in order when connecting.
    pub addresses: Vec<String>,
    /// Transport used by sessions.
    pub transport: TransportKind,
    /// Library used by the native transport.
    pub native_library: Option<Arc<dyn NativeLibrary>>,
    /// Maximum requests in flight per session (also the native packet count).
    pub max_outstanding: usize,
    /// Deadline for each request, from submission to reply.
    pub request_timeout: Duration,
    /// Deadline for connecting and the handshake.
    pub connect_timeout: Duration,
    /// Maximum encoded batch size in bytes.
    pub max_batch_size: usize,
    /// Open a fresh session on the next call after the current one broke.
    pub reconnect: bool,
    /// How often expired pending requests are swept.
    pub reap_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            cluster: Identifier::ZERO,
            addresses: Vec::new(),
            transport: TransportKind::Stream,
            native_library: None,
            max_outstanding: DEFAULT_MAX_OUTSTANDING,
            request_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            reconnect: true,
            reap_interval: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Check the configuration before opening a session.
    pub fn validate(&self) -> Result<()> {
        if self.addresses.is_empty() && self.transport != TransportKind::Native {
            return Err(ClientError::Validation("no addresses provided".into()));
        }
        if self.transport == TransportKind::Native && self.native_library.is_none() {
            return Err(ClientError::Validation(
                "native transport requires a native library".into(),
            ));
        }
        if self.max_outstanding == 0 {
            return Err(ClientError::Validation(
                "max_outstanding must be at least 1".into(),
            ));
        }
        if self.max_batch_size == 0 || self.max_batch_size > DEFAULT_MAX_BATCH_SIZE {
            return Err(ClientError::Validation(format!(
                "max_batch_size must be between 1 and {} bytes",
                DEFAULT_MAX_BATCH_SIZE
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ClientError::Validation(
                "request_timeout must be non-zero".into(),
            ));
        }
        if self.reap_interval.is_zero() {
            return Err(ClientError::Validation(
                "reap_interval must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("cluster", &self.cluster)
            .field("addresses", &self.addresses)
            .field("transport", &self.transport)
            .field("native_library", &self.native_library.is_some())
            .field("max_outstanding", &self.max_outstanding)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("max_batch_size", &self.max_batch_size)
            .field("reconnect", &self.reconnect)
            .finish()
    }
}

/// Parse a comma-separated address list.
///
/// Every entry must be `host:port` with a numeric port.
pub fn parse_addresses(addrs: &str) -> Result<Vec<String>> {
    if addrs.trim().is_empty() {
        return Err(ClientError::Validation("no addresses provided".into()));
    }
    addrs
        .split(',')
        .map(|s| {
            let s = s.trim();
            let port = s.rsplit_once(':').map(|(host, port)| (host, port.parse::<u16>()));
            match port {
                Some((host, Ok(_))) if !host.is_empty() => Ok(s.to_string()),
                _ => Err(ClientError::Validation(format!(
                    "invalid address '{}': expected host:port",
                    s
                ))),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.max_outstanding, 32);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.max_batch_size, 1024 * 1024 - 16);
        assert!(config.reconnect);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate() {
        let config = ClientConfig {
            addresses: vec!["127.0.0.1:3000".into()],
            ..ClientConfig::default()
        };
        assert!(config.validate().is_ok());

        let bad = ClientConfig {
            max_outstanding: 0,
            ..config.clone()
        };
        assert!(matches!(bad.validate(), Err(ClientError::Validation(_))));

        let bad = ClientConfig {
            max_batch_size: MESSAGE_SIZE_MAX as usize,
            ..config.clone()
        };
        assert!(bad.validate().is_err());

        let bad = ClientConfig {
            reap_interval: Duration::ZERO,
            ..config.clone()
        };
        assert_eq!(
            bad.validate(),
            Err(ClientError::Validation("reap_interval must be non-zero".into()))
        );

        let bad = ClientConfig {
            transport: TransportKind::Native,
            ..config
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_parse_addresses() {
        assert_eq!(
            parse_addresses("127.0.0.1:3000, localhost:3001").unwrap(),
            vec!["127.0.0.1:3000".to_string(), "localhost:3001".to_string()]
        );
        assert!(parse_addresses("").is_err());
        assert!(parse_addresses("not-an-address").is_err());
        assert!(parse_addresses("host:port").is_err());
        assert!(parse_addresses(":3000").is_err());
    }
}
