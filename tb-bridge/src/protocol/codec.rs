//! Fixed-layout binary codec for ledger records.
//!
//! Every multi-byte integer is little-endian. A 128-bit value is written as
//! its 16 little-endian bytes, so an [`Identifier`] lands on the wire as
//! `low` (LE u64) followed by `high` (LE u64).
//!
//! | Record         | Size | Layout |
//! |----------------|------|--------|
//! | `Account`      | 128  | id, debits_pending, debits_posted, credits_pending, credits_posted, user_data_128 (u128 each), user_data_64 u64, user_data_32 u32, reserved u32, ledger u32, code u16, flags u16, timestamp u64 |
//! | `Transfer`     | 128  | id, debit_account_id, credit_account_id, amount, pending_id, user_data_128 (u128 each), user_data_64 u64, user_data_32 u32, timeout u32, ledger u32, code u16, flags u16, timestamp u64 |
//! | `Identifier`   | 16   | u128 |
//! | `CreateResult` | 8    | index u32, result u32 |
//!
//! The wire structs below are built from `zerocopy` byte-order types, which
//! have alignment 1, so the layouts are packed without padding.

use zerocopy::byteorder::little_endian::{U128, U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use super::types::{Account, AccountFlags, CreateResult, Identifier, Transfer, TransferFlags};
use crate::error::{ClientError, Result};

/// A record with a fixed-size byte encoding.
pub trait Record: Sized + Clone + Send + Sync + 'static {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Append the encoding of `self` to `out`.
    fn encode_into(&self, out: &mut Vec<u8>);

    /// Decode one record. `bytes` must be exactly [`Self::SIZE`] long.
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Encode `self` into a fresh buffer of [`Self::SIZE`] bytes.
    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.encode_into(&mut out);
        out
    }
}

/// Encode a slice of records back to back.
pub fn encode_all<R: Record>(records: &[R]) -> Vec<u8> {
    let mut out = Vec::with_capacity(records.len() * R::SIZE);
    for record in records {
        record.encode_into(&mut out);
    }
    out
}

/// Decode a sequence of records.
///
/// Fails with [`ClientError::MalformedRecord`] if `bytes` is not a whole
/// number of records.
pub fn decode_all<R: Record>(bytes: &[u8]) -> Result<Vec<R>> {
    if bytes.len() % R::SIZE != 0 {
        return Err(ClientError::MalformedRecord {
            expected: R::SIZE,
            actual: bytes.len(),
        });
    }
    bytes.chunks_exact(R::SIZE).map(R::decode).collect()
}

fn read_wire<W: FromBytes + KnownLayout + Immutable>(bytes: &[u8], size: usize) -> Result<W> {
    W::read_from_bytes(bytes).map_err(|_| ClientError::MalformedRecord {
        expected: size,
        actual: bytes.len(),
    })
}

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct AccountWire {
    id: U128,
    debits_pending: U128,
    debits_posted: U128,
    credits_pending: U128,
    credits_posted: U128,
    user_data_128: U128,
    user_data_64: U64,
    user_data_32: U32,
    reserved: U32,
    ledger: U32,
    code: U16,
    flags: U16,
    timestamp: U64,
}

const _: () = assert!(std::mem::size_of::<AccountWire>() == 128);

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct TransferWire {
    id: U128,
    debit_account_id: U128,
    credit_account_id: U128,
    amount: U128,
    pending_id: U128,
    user_data_128: U128,
    user_data_64: U64,
    user_data_32: U32,
    timeout: U32,
    ledger: U32,
    code: U16,
    flags: U16,
    timestamp: U64,
}

const _: () = assert!(std::mem::size_of::<TransferWire>() == 128);

#[repr(C)]
#[derive(FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
struct CreateResultWire {
    index: U32,
    result: U32,
}

const _: () = assert!(std::mem::size_of::<CreateResultWire>() == 8);

fn id(value: Identifier) -> U128 {
    U128::new(value.as_u128())
}

impl Record for Account {
    const SIZE: usize = 128;

    fn encode_into(&self, out: &mut Vec<u8>) {
        let wire = AccountWire {
            id: id(self.id),
            debits_pending: U128::new(self.debits_pending),
            debits_posted: U128::new(self.debits_posted),
            credits_pending: U128::new(self.credits_pending),
            credits_posted: U128::new(self.credits_posted),
            user_data_128: id(self.user_data_128),
            user_data_64: U64::new(self.user_data_64),
            user_data_32: U32::new(self.user_data_32),
            reserved: U32::new(0),
            ledger: U32::new(self.ledger),
            code: U16::new(self.code),
            flags: U16::new(self.flags.bits()),
            timestamp: U64::new(self.timestamp),
        };
        out.extend_from_slice(wire.as_bytes());
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let wire: AccountWire = read_wire(bytes, Self::SIZE)?;
        Ok(Account {
            id: wire.id.get().into(),
            debits_pending: wire.debits_pending.get(),
            debits_posted: wire.debits_posted.get(),
            credits_pending: wire.credits_pending.get(),
            credits_posted: wire.credits_posted.get(),
            user_data_128: wire.user_data_128.get().into(),
            user_data_64: wire.user_data_64.get(),
            user_data_32: wire.user_data_32.get(),
            ledger: wire.ledger.get(),
            code: wire.code.get(),
            flags: AccountFlags::from_bits_retain(wire.flags.get()),
            timestamp: wire.timestamp.get(),
        })
    }
}

impl Record for Transfer {
    const SIZE: usize = 128;

    fn encode_into(&self, out: &mut Vec<u8>) {
        let wire = TransferWire {
            id: id(self.id),
            debit_account_id: id(self.debit_account_id),
            credit_account_id: id(self.credit_account_id),
            amount: U128::new(self.amount),
            pending_id: id(self.pending_id),
            user_data_128: id(self.user_data_128),
            user_data_64: U64::new(self.user_data_64),
            user_data_32: U32::new(self.user_data_32),
            timeout: U32::new(self.timeout),
            ledger: U32::new(self.ledger),
            code: U16::new(self.code),
            flags: U16::new(self.flags.bits()),
            timestamp: U64::new(self.timestamp),
        };
        out.extend_from_slice(wire.as_bytes());
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let wire: TransferWire = read_wire(bytes, Self::SIZE)?;
        Ok(Transfer {
            id: wire.id.get().into(),
            debit_account_id: wire.debit_account_id.get().into(),
            credit_account_id: wire.credit_account_id.get().into(),
            amount: wire.amount.get(),
            pending_id: wire.pending_id.get().into(),
            user_data_128: wire.user_data_128.get().into(),
            user_data_64: wire.user_data_64.get(),
            user_data_32: wire.user_data_32.get(),
            timeout: wire.timeout.get(),
            ledger: wire.ledger.get(),
            code: wire.code.get(),
            flags: TransferFlags::from_bits_retain(wire.flags.get()),
            timestamp: wire.timestamp.get(),
        })
    }
}

impl Record for Identifier {
    const SIZE: usize = 16;

    fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.as_u128().to_le_bytes());
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let wire: U128 = read_wire(bytes, Self::SIZE)?;
        Ok(wire.get().into())
    }
}

impl Record for CreateResult {
    const SIZE: usize = 8;

    fn encode_into(&self, out: &mut Vec<u8>) {
        let wire = CreateResultWire {
            index: U32::new(self.index),
            result: U32::new(self.result),
        };
        out.extend_from_slice(wire.as_bytes());
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let wire: CreateResultWire = read_wire(bytes, Self::SIZE)?;
        Ok(CreateResult {
            index: wire.index.get(),
            result: wire.result.get(),
        })
    }
}
