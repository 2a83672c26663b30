//! Operation codes shared with the ledger.

use std::fmt;

use super::codec::Record;
use super::types::{Account, CreateResult, Identifier, Transfer};

/// Operations understood by the ledger.
///
/// Values are opaque constants shared with the server. Operations < 128 are
/// session-level; operations >= 128 are ledger operations.
#[repr(u16)]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Operation {
    /// Session handshake; carries the cluster and client ids.
    Register = 2,
    /// Create accounts (batch).
    CreateAccounts = 138,
    /// Create transfers (batch).
    CreateTransfers = 139,
    /// Lookup accounts by ID (batch).
    LookupAccounts = 140,
    /// Lookup transfers by ID (batch).
    LookupTransfers = 141,
}

impl Operation {
    /// Ledger operations, in code order.
    pub const LEDGER: [Operation; 4] = [
        Operation::CreateAccounts,
        Operation::CreateTransfers,
        Operation::LookupAccounts,
        Operation::LookupTransfers,
    ];

    /// Wire value of this operation.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Path segment used by the HTTP transport.
    pub fn endpoint(self) -> &'static str {
        match self {
            Operation::Register => "register",
            Operation::CreateAccounts => "create_accounts",
            Operation::CreateTransfers => "create_transfers",
            Operation::LookupAccounts => "lookup_accounts",
            Operation::LookupTransfers => "lookup_transfers",
        }
    }

    /// Inverse of [`endpoint`](Self::endpoint) for ledger operations.
    pub fn from_endpoint(endpoint: &str) -> Option<Self> {
        Self::LEDGER.into_iter().find(|op| op.endpoint() == endpoint)
    }

    /// Returns true for create operations, whose replies list failures only.
    pub fn is_create(self) -> bool {
        matches!(self, Operation::CreateAccounts | Operation::CreateTransfers)
    }

    /// Size of one request record, or `None` for the handshake.
    pub fn event_size(self) -> Option<usize> {
        match self {
            Operation::Register => None,
            Operation::CreateAccounts => Some(Account::SIZE),
            Operation::CreateTransfers => Some(Transfer::SIZE),
            Operation::LookupAccounts | Operation::LookupTransfers => Some(Identifier::SIZE),
        }
    }

    /// Size of one reply record, or `None` for the handshake.
    pub fn result_size(self) -> Option<usize> {
        match self {
            Operation::Register => None,
            Operation::CreateAccounts | Operation::CreateTransfers => Some(CreateResult::SIZE),
            Operation::LookupAccounts => Some(Account::SIZE),
            Operation::LookupTransfers => Some(Transfer::SIZE),
        }
    }
}

impl TryFrom<u16> for Operation {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(Operation::Register),
            138 => Ok(Operation::CreateAccounts),
            139 => Ok(Operation::CreateTransfers),
            140 => Ok(Operation::LookupAccounts),
            141 => Ok(Operation::LookupTransfers),
            _ => Err(value),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}
