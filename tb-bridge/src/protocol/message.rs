//! Frame serialization.
//!
//! A message is a 16-byte [`FrameHeader`] followed by `size - 16` payload
//! bytes. Ledger payloads are records encoded back to back; the handshake has
//! its own small payloads defined here.

use zerocopy::byteorder::little_endian::{U128, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::header::{FrameHeader, HEADER_SIZE};
use super::operation::Operation;
use super::types::Identifier;
use crate::error::{PacketStatus, ProtocolError};

/// Maximum frame size (1 MiB).
pub const MESSAGE_SIZE_MAX: u32 = 1024 * 1024;

/// Maximum payload size.
pub const MESSAGE_BODY_SIZE_MAX: u32 = MESSAGE_SIZE_MAX - HEADER_SIZE as u32;

/// A complete frame with header and payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    header: FrameHeader,
    body: Vec<u8>,
}

impl Message {
    /// Assemble a message; the header size is recomputed from `body`.
    pub fn new(mut header: FrameHeader, body: Vec<u8>) -> Self {
        header.size = (HEADER_SIZE + body.len()) as u32;
        Self { header, body }
    }

    /// Build a reply frame.
    pub fn reply(operation: u16, status: PacketStatus, tag: u32, body: Vec<u8>) -> Self {
        let header = FrameHeader::reply(operation, status, tag, body.len());
        Self { header, body }
    }

    /// Parse a whole frame from bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        let header_bytes: &[u8; HEADER_SIZE] = bytes
            .get(..HEADER_SIZE)
            .and_then(|b| b.try_into().ok())
            .ok_or(ProtocolError::InvalidSize)?;
        let header = FrameHeader::decode(header_bytes)?;
        if bytes.len() != header.size as usize {
            return Err(ProtocolError::InvalidSize);
        }
        Ok(Self {
            header,
            body: bytes[HEADER_SIZE..].to_vec(),
        })
    }

    /// The frame header.
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// The payload.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consume the message and return the payload.
    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Encode header and payload into one contiguous buffer.
    ///
    /// Stream writers send this buffer with a single `write_all`, so frames
    /// never interleave on the wire.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.body.len());
        out.extend_from_slice(&self.header.encode());
        out.extend_from_slice(&self.body);
        out
    }

    /// Total frame size (header + payload).
    pub fn len(&self) -> usize {
        HEADER_SIZE + self.body.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Builder for constructing request messages.
pub struct RequestBuilder {
    operation: Operation,
    tag: u32,
    body: Vec<u8>,
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            tag: 0,
            body: Vec::new(),
        }
    }

    /// Set the correlation tag.
    pub fn tag(mut self, tag: u32) -> Self {
        self.tag = tag;
        self
    }

    /// Set the body data.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Build the message, rejecting bodies over the frame limit.
    pub fn build(self) -> Result<Message, ProtocolError> {
        if self.body.len() > MESSAGE_BODY_SIZE_MAX as usize {
            return Err(ProtocolError::InvalidSize);
        }
        let header = FrameHeader::request(self.operation, self.tag, self.body.len());
        Ok(Message::new(header, self.body))
    }
}

/// Handshake request payload (32 bytes): cluster id then client id.
#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RegisterRequest {
    cluster: U128,
    client: U128,
}

const _: () = assert!(std::mem::size_of::<RegisterRequest>() == 32);

impl RegisterRequest {
    /// Handshake for `client` joining `cluster`.
    pub fn new(cluster: Identifier, client: Identifier) -> Self {
        Self {
            cluster: U128::new(cluster.as_u128()),
            client: U128::new(client.as_u128()),
        }
    }

    /// Parse a handshake payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::read_from_bytes(bytes).map_err(|_| ProtocolError::InvalidSize)
    }

    /// Cluster the client expects to talk to.
    pub fn cluster(&self) -> Identifier {
        self.cluster.get().into()
    }

    /// Client id.
    pub fn client(&self) -> Identifier {
        self.client.get().into()
    }

    /// The request as a tag-0 frame.
    pub fn to_message(&self) -> Message {
        let body = self.as_bytes().to_vec();
        Message::new(FrameHeader::request(Operation::Register, 0, body.len()), body)
    }
}

/// Handshake reply payload (16 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct RegisterReply {
    batch_size_limit: U32,
    reserved: [u8; 12],
}

const _: () = assert!(std::mem::size_of::<RegisterReply>() == 16);

impl RegisterReply {
    /// Reply advertising `batch_size_limit` payload bytes (0 = no limit).
    pub fn new(batch_size_limit: u32) -> Self {
        Self {
            batch_size_limit: U32::new(batch_size_limit),
            reserved: [0; 12],
        }
    }

    /// Parse a handshake reply payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        Self::read_from_bytes(bytes).map_err(|_| ProtocolError::InvalidSize)
    }

    /// Advertised batch size limit, `None` when the server sets no limit.
    pub fn batch_size_limit(&self) -> Option<u32> {
        match self.batch_size_limit.get() {
            0 => None,
            limit => Some(limit),
        }
    }

    /// Payload bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let msg = RequestBuilder::new(Operation::CreateAccounts)
            .tag(42)
            .body(vec![1, 2, 3, 4])
            .build()
            .unwrap();

        assert_eq!(msg.header().operation, Operation::CreateAccounts.code());
        assert_eq!(msg.header().tag, 42);
        assert_eq!(msg.header().size, 20);
        assert_eq!(msg.body(), &[1, 2, 3, 4]);
        assert_eq!(msg.len(), 20);
    }

    #[test]
    fn test_request_builder_rejects_oversized_body() {
        let body = vec![0u8; MESSAGE_BODY_SIZE_MAX as usize + 1];
        let result = RequestBuilder::new(Operation::LookupAccounts).body(body).build();
        assert_eq!(result, Err(ProtocolError::InvalidSize));
    }

    #[test]
    fn test_encode_decode() {
        let msg = Message::reply(140, PacketStatus::Ok, 9, vec![7; 128]);
        let bytes = msg.encode();
        assert_eq!(bytes.len(), HEADER_SIZE + 128);
        assert_eq!(&bytes[..4], &144u32.to_le_bytes());
        assert_eq!(Message::decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_decode_truncated() {
        let msg = Message::reply(140, PacketStatus::Ok, 9, vec![7; 8]);
        let bytes = msg.encode();
        assert_eq!(Message::decode(&bytes[..20]), Err(ProtocolError::InvalidSize));
        assert_eq!(Message::decode(&bytes[..3]), Err(ProtocolError::InvalidSize));
    }

    #[test]
    fn test_register_request() {
        let request = RegisterRequest::new(Identifier::new(0, 5), Identifier::new(1, 2));
        let msg = request.to_message();
        assert_eq!(msg.header().operation, Operation::Register.code());
        assert_eq!(msg.header().tag, 0);
        assert_eq!(msg.body().len(), 32);
        assert_eq!(&msg.body()[..16], &5u128.to_le_bytes());

        let parsed = RegisterRequest::decode(msg.body()).unwrap();
        assert_eq!(parsed.cluster(), Identifier::new(0, 5));
        assert_eq!(parsed.client(), Identifier::new(1, 2));
    }

    #[test]
    fn test_register_reply() {
        let reply = RegisterReply::decode(&RegisterReply::new(4096).to_bytes()).unwrap();
        assert_eq!(reply.batch_size_limit(), Some(4096));
        assert_eq!(RegisterReply::new(0).batch_size_limit(), None);
        assert!(RegisterReply::decode(&[0u8; 4]).is_err());
    }
}
