//! Ledger data types.
//!
//! These are the in-memory forms of the records exchanged with the ledger.
//! Their byte layout lives in [`codec`](super::codec); their JSON form (used by
//! the HTTP transport) is derived here with PascalCase keys and
//! `{"high", "low"}` identifiers.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 128-bit identifier made of a `high` and a `low` 64-bit half.
///
/// Ordering and hashing follow the concatenated value `high << 64 | low`.
/// The zero identifier is reserved and rejected by create operations.
#[derive(Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Identifier(u128);

impl Identifier {
    /// The reserved zero identifier.
    pub const ZERO: Identifier = Identifier(0);

    /// Build an identifier from its two halves.
    pub const fn new(high: u64, low: u64) -> Self {
        Identifier(((high as u128) << 64) | low as u128)
    }

    /// Build an identifier from a full 128-bit value.
    pub const fn from_u128(value: u128) -> Self {
        Identifier(value)
    }

    /// Upper 64 bits.
    pub const fn high(self) -> u64 {
        (self.0 >> 64) as u64
    }

    /// Lower 64 bits.
    pub const fn low(self) -> u64 {
        self.0 as u64
    }

    /// The concatenated 128-bit value.
    pub const fn as_u128(self) -> u128 {
        self.0
    }

    /// Returns true for the reserved zero identifier.
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl From<u128> for Identifier {
    fn from(value: u128) -> Self {
        Identifier(value)
    }
}

impl From<Identifier> for u128 {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({}, {})", self.high(), self.low())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = std::num::ParseIntError;

    /// Parses up to 32 hex digits, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        u128::from_str_radix(digits, 16).map(Identifier)
    }
}

#[derive(Serialize, Deserialize)]
struct IdentifierRepr {
    high: u64,
    low: u64,
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        IdentifierRepr {
            high: self.high(),
            low: self.low(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = IdentifierRepr::deserialize(deserializer)?;
        Ok(Identifier::new(repr.high, repr.low))
    }
}

bitflags! {
    /// Flags for Account configuration.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct AccountFlags: u16 {
        /// Link this account with the next in a chain.
        const LINKED = 1 << 0;
        /// Enforce that debits do not exceed credits.
        const DEBITS_MUST_NOT_EXCEED_CREDITS = 1 << 1;
        /// Enforce that credits do not exceed debits.
        const CREDITS_MUST_NOT_EXCEED_DEBITS = 1 << 2;
        /// Enable balance history for this account.
        const HISTORY = 1 << 3;
        /// Mark this account as imported.
        const IMPORTED = 1 << 4;
        /// Mark this account as closed.
        const CLOSED = 1 << 5;
    }
}

bitflags! {
    /// Flags for Transfer configuration.
    #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
    pub struct TransferFlags: u16 {
        /// Link this transfer with the next in a chain.
        const LINKED = 1 << 0;
        /// Create a pending (two-phase) transfer.
        const PENDING = 1 << 1;
        /// Post a pending transfer.
        const POST_PENDING_TRANSFER = 1 << 2;
        /// Void a pending transfer.
        const VOID_PENDING_TRANSFER = 1 << 3;
        /// Balance the debit side.
        const BALANCING_DEBIT = 1 << 4;
        /// Balance the credit side.
        const BALANCING_CREDIT = 1 << 5;
        /// Close the debit account after this transfer.
        const CLOSING_DEBIT = 1 << 6;
        /// Close the credit account after this transfer.
        const CLOSING_CREDIT = 1 << 7;
        /// Mark this transfer as imported.
        const IMPORTED = 1 << 8;
    }
}

// Flags travel as plain integers in JSON; unknown bits are kept.
macro_rules! serde_bits {
    ($flags:ty) => {
        impl Serialize for $flags {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u16(self.bits())
            }
        }

        impl<'de> Deserialize<'de> for $flags {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                u16::deserialize(deserializer).map(<$flags>::from_bits_retain)
            }
        }
    };
}

serde_bits!(AccountFlags);
serde_bits!(TransferFlags);

/// Ledger account.
///
/// `id`, the user data fields, `ledger`, `code` and `flags` are set by the
/// client on creation. Balances and `timestamp` are owned by the server and
/// must be zero in create requests.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Account {
    /// Unique identifier for the account.
    pub id: Identifier,
    /// Sum of pending debit transfers.
    pub debits_pending: u128,
    /// Sum of posted debit transfers.
    pub debits_posted: u128,
    /// Sum of pending credit transfers.
    pub credits_pending: u128,
    /// Sum of posted credit transfers.
    pub credits_posted: u128,
    /// Opaque user data (128-bit).
    pub user_data_128: Identifier,
    /// Opaque user data (64-bit).
    pub user_data_64: u64,
    /// Opaque user data (32-bit).
    pub user_data_32: u32,
    /// The ledger this account belongs to.
    pub ledger: u32,
    /// Chart of accounts code describing the account type.
    pub code: u16,
    /// Account flags.
    pub flags: AccountFlags,
    /// Creation timestamp (set by server).
    pub timestamp: u64,
}

/// Ledger transfer between two accounts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Transfer {
    /// Unique identifier for the transfer.
    pub id: Identifier,
    /// Account to debit.
    pub debit_account_id: Identifier,
    /// Account to credit.
    pub credit_account_id: Identifier,
    /// Amount to move.
    pub amount: u128,
    /// Pending transfer to post or void (zero if not applicable).
    pub pending_id: Identifier,
    /// Opaque user data (128-bit).
    pub user_data_128: Identifier,
    /// Opaque user data (64-bit).
    pub user_data_64: u64,
    /// Opaque user data (32-bit).
    pub user_data_32: u32,
    /// Timeout in seconds for pending transfers.
    pub timeout: u32,
    /// The ledger this transfer operates on.
    pub ledger: u32,
    /// Chart of accounts code describing the transfer type.
    pub code: u16,
    /// Transfer flags.
    pub flags: TransferFlags,
    /// Creation timestamp (set by server).
    pub timestamp: u64,
}

/// Outcome of one failed record in a create batch.
///
/// Only failed records are reported; a record whose index is absent from the
/// results was created. `result` is the server's code, passed through
/// uninterpreted (see [`result_code`](super::result_code) for known values).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CreateResult {
    /// Index of the record in the submitted input.
    pub index: u32,
    /// Server result code (never zero in a reply).
    pub result: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_halves() {
        let id = Identifier::new(1, 2);
        assert_eq!(id.high(), 1);
        assert_eq!(id.low(), 2);
        assert_eq!(id.as_u128(), (1u128 << 64) | 2);
        assert!(!id.is_zero());
        assert!(Identifier::ZERO.is_zero());
    }

    #[test]
    fn test_identifier_ordering_follows_concatenation() {
        assert!(Identifier::new(0, u64::MAX) < Identifier::new(1, 0));
        assert!(Identifier::new(0, 137) < Identifier::new(0, 999));
    }

    #[test]
    fn test_identifier_display_and_parse() {
        let id = Identifier::new(0, 137);
        assert_eq!(id.to_string(), "00000000000000000000000000000089");
        assert_eq!("0x89".parse::<Identifier>().unwrap(), id);
        assert!("xyz".parse::<Identifier>().is_err());
    }

    #[test]
    fn test_identifier_json() {
        let id = Identifier::new(3, 137);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, r#"{"high":3,"low":137}"#);
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_account_json_keys() {
        let account = Account {
            id: Identifier::new(0, 137),
            user_data_128: Identifier::new(0, 1),
            user_data_64: 1000,
            user_data_32: 100,
            ledger: 1,
            code: 718,
            ..Default::default()
        };
        let value = serde_json::to_value(account).unwrap();
        assert_eq!(value["Id"]["low"], 137);
        assert_eq!(value["UserData128"]["low"], 1);
        assert_eq!(value["UserData64"], 1000);
        assert_eq!(value["UserData32"], 100);
        assert_eq!(value["Ledger"], 1);
        assert_eq!(value["Code"], 718);
        assert_eq!(value["Flags"], 0);
    }

    #[test]
    fn test_transfer_json_defaults_missing_fields() {
        let json = r#"{
            "Id": {"high": 0, "low": 1},
            "DebitAccountId": {"high": 0, "low": 137},
            "CreditAccountId": {"high": 0, "low": 138},
            "Amount": 10,
            "Ledger": 1,
            "Code": 1,
            "Flags": 2
        }"#;
        let transfer: Transfer = serde_json::from_str(json).unwrap();
        assert_eq!(transfer.debit_account_id, Identifier::new(0, 137));
        assert_eq!(transfer.amount, 10);
        assert_eq!(transfer.flags, TransferFlags::PENDING);
        assert_eq!(transfer.timeout, 0);
        assert!(transfer.pending_id.is_zero());
    }

    #[test]
    fn test_flags_keep_unknown_bits() {
        let flags: AccountFlags = serde_json::from_str("32769").unwrap();
        assert!(flags.contains(AccountFlags::LINKED));
        assert_eq!(flags.bits(), 0x8001);
    }

    #[test]
    fn test_account_flags() {
        let flags = AccountFlags::LINKED | AccountFlags::HISTORY;
        assert_eq!(flags.bits(), 0b1001);
    }

    #[test]
    fn test_transfer_flags() {
        let flags = TransferFlags::PENDING | TransferFlags::LINKED;
        assert_eq!(flags.bits(), 0b11);
    }
}
