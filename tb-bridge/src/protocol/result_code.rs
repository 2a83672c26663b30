//! Known per-record result codes.
//!
//! The client never interprets these; they are here for callers (and the
//! in-memory ledger used in tests) that want names for common outcomes.

/// Result codes of `create_accounts`.
pub mod account {
    /// A linked event in the batch failed, so this event was not applied.
    pub const LINKED_EVENT_FAILED: u32 = 1;
    /// A linked event chain was not closed.
    pub const LINKED_EVENT_CHAIN_OPEN: u32 = 2;
    /// The timestamp field must be zero.
    pub const TIMESTAMP_MUST_BE_ZERO: u32 = 3;
    /// Account id must not be zero.
    pub const ID_MUST_NOT_BE_ZERO: u32 = 6;
    /// Account id must not be `u128::MAX`.
    pub const ID_MUST_NOT_BE_INT_MAX: u32 = 7;
    /// Mutually exclusive flags were set together.
    pub const FLAGS_ARE_MUTUALLY_EXCLUSIVE: u32 = 8;
    /// Balances must be zero on creation.
    pub const DEBITS_PENDING_MUST_BE_ZERO: u32 = 9;
    /// Ledger must not be zero.
    pub const LEDGER_MUST_NOT_BE_ZERO: u32 = 13;
    /// Code must not be zero.
    pub const CODE_MUST_NOT_BE_ZERO: u32 = 14;
    /// Account exists with different flags.
    pub const EXISTS_WITH_DIFFERENT_FLAGS: u32 = 15;
    /// Account already exists.
    pub const EXISTS: u32 = 21;
}

/// Result codes of `create_transfers`.
pub mod transfer {
    /// A linked event in the batch failed, so this event was not applied.
    pub const LINKED_EVENT_FAILED: u32 = 1;
    /// Transfer id must not be zero.
    pub const ID_MUST_NOT_BE_ZERO: u32 = 5;
    /// Debit account id must not be zero.
    pub const DEBIT_ACCOUNT_ID_MUST_NOT_BE_ZERO: u32 = 8;
    /// Credit account id must not be zero.
    pub const CREDIT_ACCOUNT_ID_MUST_NOT_BE_ZERO: u32 = 10;
    /// Debit and credit accounts must be different.
    pub const ACCOUNTS_MUST_BE_DIFFERENT: u32 = 12;
    /// Ledger must not be zero.
    pub const LEDGER_MUST_NOT_BE_ZERO: u32 = 19;
    /// Code must not be zero.
    pub const CODE_MUST_NOT_BE_ZERO: u32 = 20;
    /// Debit account not found.
    pub const DEBIT_ACCOUNT_NOT_FOUND: u32 = 21;
    /// Credit account not found.
    pub const CREDIT_ACCOUNT_NOT_FOUND: u32 = 22;
    /// Debit and credit accounts must be on the same ledger.
    pub const ACCOUNTS_MUST_HAVE_THE_SAME_LEDGER: u32 = 23;
    /// Transfer ledger must match the accounts' ledger.
    pub const TRANSFER_MUST_HAVE_THE_SAME_LEDGER_AS_ACCOUNTS: u32 = 24;
    /// Transfer already exists.
    pub const EXISTS: u32 = 46;
    /// Transfer exceeds the credit account's available credits.
    pub const EXCEEDS_CREDITS: u32 = 54;
    /// Transfer exceeds the debit account's available debits.
    pub const EXCEEDS_DEBITS: u32 = 55;
}
