//! Configuration for tb-proxy.

use std::net::SocketAddr;
use std::time::Duration;

use tb_bridge::{Identifier, TransportKind};

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server.
    pub address: SocketAddr,
    /// Ledger addresses, tried in order.
    pub ledger_addresses: Vec<String>,
    /// Ledger cluster id.
    pub cluster_id: Identifier,
    /// Transport used to reach the ledger.
    pub transport: TransportKind,
    /// Deadline for each ledger request.
    pub request_timeout: Duration,
}
