//! Wire protocol.
//!
//! This module contains the record types, their fixed-layout binary codec
//! and the frame format used to talk to the ledger. All multi-byte integers
//! are little-endian.

pub mod codec;
pub mod header;
pub mod message;
pub mod operation;
pub mod result_code;
pub mod types;

// Re-export commonly used items
pub use codec::{decode_all, encode_all, Record};
pub use header::{FrameFlags, FrameHeader, HEADER_SIZE};
pub use message::{
    Message, RegisterReply, RegisterRequest, RequestBuilder, MESSAGE_BODY_SIZE_MAX,
    MESSAGE_SIZE_MAX,
};
pub use operation::Operation;
pub use types::{Account, AccountFlags, CreateResult, Identifier, Transfer, TransferFlags};
