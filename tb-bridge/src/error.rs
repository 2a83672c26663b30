//! Error types for the ledger client.
//!
//! Per-record outcomes of create operations are data
//! ([`CreateResult`](crate::CreateResult)), never errors. Everything here
//! fails the whole call it is returned from.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Main error type for client operations.
///
/// Errors are `Clone` so that a single transport failure can be delivered to
/// every in-flight request of the session that observed it.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ClientError {
    /// Caller input was rejected before anything was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// A record could not be decoded from its byte representation.
    #[error("malformed record: expected {expected} bytes, got {actual}")]
    MalformedRecord {
        /// Expected byte length (or record size for sequences).
        expected: usize,
        /// Actual byte length received.
        actual: usize,
    },

    /// An operation was submitted with no records.
    #[error("batch is empty")]
    EmptyBatch,

    /// A single record does not fit in a batch.
    #[error("batch too large: {size} bytes exceeds limit of {limit} bytes")]
    BatchTooLarge {
        /// Encoded size in bytes.
        size: usize,
        /// Batch size limit in bytes.
        limit: usize,
    },

    /// Connection refused, reset, or a read/write failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// No completion within the deadline.
    #[error("operation timed out")]
    Timeout,

    /// The peer sent something that does not follow the framing rules.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer answered with a non-OK packet status.
    #[error("request rejected: {0}")]
    Rejected(PacketStatus),

    /// No free correlation tag or packet is available.
    #[error("client busy: {0}")]
    Busy(String),

    /// The client or session has been closed.
    #[error("client is shutting down")]
    Shutdown,
}

impl ClientError {
    /// Returns true if this error means the session can no longer be used.
    pub fn is_fatal_to_session(&self) -> bool {
        matches!(
            self,
            ClientError::Transport(_) | ClientError::Protocol(_) | ClientError::Shutdown
        )
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<InitStatus> for ClientError {
    fn from(status: InitStatus) -> Self {
        ClientError::Transport(format!("native client init failed: {}", status))
    }
}

/// Protocol-level errors.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum ProtocolError {
    /// Header fields are inconsistent.
    #[error("invalid header structure")]
    InvalidHeader,
    /// Frame size is below the header size or above the message limit.
    #[error("invalid message size")]
    InvalidSize,
    /// Operation code is not one this client knows.
    #[error("invalid operation")]
    InvalidOperation,
    /// Reply operation differs from the request it answers.
    #[error("unexpected reply")]
    UnexpectedReply,
    /// Reply payload length is not a multiple of the result record size.
    #[error("unexpected reply payload")]
    UnexpectedPayload,
}

/// Packet-level status codes carried in the frame header of a reply.
#[derive(Clone, Copy, Debug, Default, Error, Eq, PartialEq, Hash)]
pub enum PacketStatus {
    /// Operation completed successfully.
    #[default]
    #[error("ok")]
    Ok,
    /// Request data was too large.
    #[error("too much data")]
    TooMuchData,
    /// Client was evicted.
    #[error("client evicted")]
    ClientEvicted,
    /// Client release is too old.
    #[error("client release too low")]
    ClientReleaseTooLow,
    /// Client release is too new.
    #[error("client release too high")]
    ClientReleaseTooHigh,
    /// Client was shut down.
    #[error("client shutdown")]
    ClientShutdown,
    /// Invalid operation.
    #[error("invalid operation")]
    InvalidOperation,
    /// Invalid data size.
    #[error("invalid data size")]
    InvalidDataSize,
    /// A status this client does not know.
    #[error("status {0}")]
    Other(u16),
}

impl PacketStatus {
    /// Wire value of this status.
    pub fn code(self) -> u16 {
        match self {
            PacketStatus::Ok => 0,
            PacketStatus::TooMuchData => 1,
            PacketStatus::ClientEvicted => 2,
            PacketStatus::ClientReleaseTooLow => 3,
            PacketStatus::ClientReleaseTooHigh => 4,
            PacketStatus::ClientShutdown => 5,
            PacketStatus::InvalidOperation => 6,
            PacketStatus::InvalidDataSize => 7,
            PacketStatus::Other(code) => code,
        }
    }
}

impl From<u16> for PacketStatus {
    fn from(code: u16) -> Self {
        match code {
            0 => PacketStatus::Ok,
            1 => PacketStatus::TooMuchData,
            2 => PacketStatus::ClientEvicted,
            3 => PacketStatus::ClientReleaseTooLow,
            4 => PacketStatus::ClientReleaseTooHigh,
            5 => PacketStatus::ClientShutdown,
            6 => PacketStatus::InvalidOperation,
            7 => PacketStatus::InvalidDataSize,
            other => PacketStatus::Other(other),
        }
    }
}

/// Initialization status codes of a native client library.
#[derive(Clone, Copy, Debug, Error, Eq, PartialEq)]
pub enum InitStatus {
    /// Unexpected error.
    #[error("unexpected error")]
    Unexpected,
    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,
    /// Invalid address.
    #[error("invalid address")]
    AddressInvalid,
    /// Too many addresses.
    #[error("address limit exceeded")]
    AddressLimitExceeded,
    /// System resource error.
    #[error("system resources error")]
    SystemResources,
    /// Network subsystem error.
    #[error("network subsystem error")]
    NetworkSubsystem,
}
