//! Ledger client protocol adapter.
//!
//! Turns slices of typed ledger records into fixed-layout binary batches,
//! sends them over one of several transports, and matches every reply to the
//! call that is waiting for it.
//!
//! # Features
//!
//! - **Concurrent**: one `Client` serves any number of tasks; replies are
//!   correlated by tag, never by arrival order
//! - **Type-safe**: strong types for accounts, transfers and create results
//! - **Pluggable transports**: TCP stream, HTTP/JSON, or a callback-driven
//!   native library
//!
//! # Quick Start
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
//! assert!(errors.is_empty(), "Account creation failed");
//!
//! let accounts = client.lookup_accounts(&[account.id]).await?;
//! println!("Found {} accounts", accounts.len());
//!
//! client.close().await;
//! ```
//!
//! # Configuration
//!
//! ```ignore
//! use std::time::Duration;
//! use tb_bridge::{Client, TransportKind};
//!
//! let client = Client::builder()
//!     .cluster(0)
//!     .addresses("127.0.0.1:3000,127.0.0.1:3001")?
//!     .transport(TransportKind::Stream)
//!     .connect_timeout(Duration::from_secs(10))
//!     .request_timeout(Duration::from_millis(500))
//!     .build()
//!     .await?;
//! ```

#![warn(missing_docs)]

pub mod batch;
mod client;
pub mod config;
pub mod correlator;
mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod transport;

#[cfg(feature = "sync")]
pub mod blocking;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Internal implementation (not public)
mod internal;

pub use batch::{Batch, BatchBuilder};
pub use client::{Client, ClientBuilder};
pub use config::ClientConfig;
pub use error::{ClientError, InitStatus, PacketStatus, ProtocolError, Result};
pub use event::{Event, EventSink, NoopSink, TracingSink};
pub use transport::TransportKind;

#[cfg(feature = "sync")]
pub use blocking::BlockingClient;

pub use protocol::{
    result_code, Account, AccountFlags, CreateResult, Identifier, Operation, Record, Transfer,
    TransferFlags,
};

/// Generate a unique identifier.
///
/// The high 64 bits are the current time in nanoseconds and the low 64 bits
/// are random, so ids sort roughly by creation time.
///
/// # Example
///
/// ```
/// let account_id = tb_bridge::id();
/// let transfer_id = tb_bridge::id();
/// assert_ne!(account_id, transfer_id);
/// ```
pub fn id() -> Identifier {
    use std::time::{SystemTime, UNIX_EPOCH};

    // A clock before the epoch only costs the time ordering.
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();

    let random: u64 = rand::random();

    Identifier::new(timestamp, random)
}
