//! Frame header (16 bytes, little-endian).
//!
//! Every frame on the stream transport starts with this header:
//!
//! | offset | field     | type | notes                               |
//! |--------|-----------|------|-------------------------------------|
//! | 0      | size      | u32  | header + payload, in bytes          |
//! | 4      | operation | u16  | [`Operation`] code                  |
//! | 6      | status    | u16  | reply status, zero in requests      |
//! | 8      | tag       | u32  | correlation tag, 0 = handshake      |
//! | 12     | flags     | u32  | [`FrameFlags`]                      |

use bitflags::bitflags;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::message::MESSAGE_SIZE_MAX;
use super::operation::Operation;
use crate::error::{PacketStatus, ProtocolError};

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 16;

bitflags! {
    /// Frame flags.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct FrameFlags: u32 {
        /// Set on frames sent by the server.
        const REPLY = 1 << 0;
    }
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct HeaderWire {
    size: U32,
    operation: U16,
    status: U16,
    tag: U32,
    flags: U32,
}

const _: () = assert!(std::mem::size_of::<HeaderWire>() == HEADER_SIZE);

/// Decoded frame header.
///
/// `operation` is kept as the raw code so that frames carrying unknown
/// operations can still be framed and reported.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    /// Total frame size (header + payload).
    pub size: u32,
    /// Operation code.
    pub operation: u16,
    /// Reply status (zero in requests).
    pub status: u16,
    /// Correlation tag.
    pub tag: u32,
    /// Frame flags.
    pub flags: FrameFlags,
}

impl FrameHeader {
    /// Header for a request carrying `body_len` payload bytes.
    pub fn request(operation: Operation, tag: u32, body_len: usize) -> Self {
        Self {
            size: (HEADER_SIZE + body_len) as u32,
            operation: operation.code(),
            status: PacketStatus::Ok.code(),
            tag,
            flags: FrameFlags::empty(),
        }
    }

    /// Header for a reply carrying `body_len` payload bytes.
    pub fn reply(operation: u16, status: PacketStatus, tag: u32, body_len: usize) -> Self {
        Self {
            size: (HEADER_SIZE + body_len) as u32,
            operation,
            status: status.code(),
            tag,
            flags: FrameFlags::REPLY,
        }
    }

    /// Encode to wire bytes.
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let wire = HeaderWire {
            size: U32::new(self.size),
            operation: U16::new(self.operation),
            status: U16::new(self.status),
            tag: U32::new(self.tag),
            flags: U32::new(self.flags.bits()),
        };
        let mut out = [0u8; HEADER_SIZE];
        out.copy_from_slice(wire.as_bytes());
        out
    }

    /// Decode and validate a header.
    ///
    /// Fails if `size` is smaller than the header or larger than
    /// [`MESSAGE_SIZE_MAX`].
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Result<Self, ProtocolError> {
        let wire = HeaderWire::read_from_bytes(bytes).map_err(|_| ProtocolError::InvalidHeader)?;
        let header = Self {
            size: wire.size.get(),
            operation: wire.operation.get(),
            status: wire.status.get(),
            tag: wire.tag.get(),
            flags: FrameFlags::from_bits_retain(wire.flags.get()),
        };
        if (header.size as usize) < HEADER_SIZE || header.size > MESSAGE_SIZE_MAX {
            return Err(ProtocolError::InvalidSize);
        }
        Ok(header)
    }

    /// Number of payload bytes following the header.
    pub fn body_len(&self) -> usize {
        (self.size as usize).saturating_sub(HEADER_SIZE)
    }

    /// Returns true if the frame was sent by the server.
    pub fn is_reply(&self) -> bool {
        self.flags.contains(FrameFlags::REPLY)
    }

    /// Reply status.
    pub fn packet_status(&self) -> PacketStatus {
        PacketStatus::from(self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_little_endian() {
        let header = FrameHeader {
            size: 0x0102_0304,
            operation: 0x0506,
            status: 0x0708,
            tag: 0x090A_0B0C,
            flags: FrameFlags::REPLY,
        };
        assert_eq!(
            header.encode(),
            [
                0x04, 0x03, 0x02, 0x01, // size
                0x06, 0x05, // operation
                0x08, 0x07, // status
                0x0C, 0x0B, 0x0A, 0x09, // tag
                0x01, 0x00, 0x00, 0x00, // flags
            ]
        );
    }

    #[test]
    fn test_request_header() {
        let header = FrameHeader::request(Operation::CreateAccounts, 7, 128);
        assert_eq!(header.size, 144);
        assert_eq!(header.body_len(), 128);
        assert_eq!(header.operation, 138);
        assert_eq!(header.status, 0);
        assert!(!header.is_reply());

        let decoded = FrameHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_reply_header() {
        let header = FrameHeader::reply(140, PacketStatus::TooMuchData, 3, 0);
        assert!(header.is_reply());
        assert_eq!(header.packet_status(), PacketStatus::TooMuchData);
        assert_eq!(header.body_len(), 0);
    }

    #[test]
    fn test_decode_rejects_bad_sizes() {
        let mut header = FrameHeader::request(Operation::LookupAccounts, 1, 0);
        header.size = 15;
        assert_eq!(
            FrameHeader::decode(&header.encode()),
            Err(ProtocolError::InvalidSize)
        );

        header.size = MESSAGE_SIZE_MAX + 1;
        assert_eq!(
            FrameHeader::decode(&header.encode()),
            Err(ProtocolError::InvalidSize)
        );

        header.size = MESSAGE_SIZE_MAX;
        assert!(FrameHeader::decode(&header.encode()).is_ok());
    }
}
