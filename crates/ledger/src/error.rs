//! Ledger error types.
//!
//! [`LedgerError`] is returned synchronously by every ledger operation. The
//! ledger never logs, retries or swallows these; the caller decides.

use std::fmt;

use ledger_core::{Address, Interval, InvalidRange, TokenId};
use storage::StorageError;

// ---------------------------------------------------------------------------
// LedgerError
// ---------------------------------------------------------------------------

/// Errors from range ledger and chain service operations.
#[derive(Debug)]
pub enum LedgerError {
    /// The supplied range is malformed (empty, reversed, negative).
    InvalidRange(InvalidRange),

    /// A pick was requested for a zero amount.
    InvalidAmount,

    /// The range to remove is not inside any single owned interval.
    RangeNotOwned {
        /// Account the removal targeted.
        owner: Address,
        /// The requested range.
        interval: Interval,
    },

    /// The added range intersects an owned one and the overlap policy is
    /// `Reject`.
    OverlappingRange {
        /// Account the addition targeted.
        owner: Address,
        /// The requested range.
        interval: Interval,
        /// The owned interval it collides with.
        existing: Interval,
    },

    /// The owner's intervals for the token do not cover the requested amount.
    InsufficientBalance {
        /// Token being picked.
        token: TokenId,
        /// Sum of all owned widths.
        available: u128,
        /// Requested amount.
        requested: u128,
    },

    /// A transaction without transfers.
    EmptyTransaction,

    /// The proof checker refused the transaction.
    ProofRejected(String),

    /// A deposit with the same token and start, but a different owner,
    /// end or block, is already recorded.
    ConflictingDeposit {
        /// Storage key of the recorded deposit.
        key: String,
        /// Range of the recorded deposit.
        recorded: Interval,
    },

    /// A stored record violates its format or the range set invariants.
    CorruptRecord {
        /// Storage key of the offending record.
        key: String,
        /// What is wrong with it.
        reason: String,
    },

    /// The key-value store failed. Passed through unchanged.
    Store(StorageError),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRange(e) => write!(f, "{e}"),
            Self::InvalidAmount => write!(f, "amount must be greater than zero"),
            Self::RangeNotOwned { owner, interval } => {
                write!(f, "range {interval} is not owned by {owner}")
            }
            Self::OverlappingRange {
                owner,
                interval,
                existing,
            } => write!(
                f,
                "range {interval} overlaps {existing} already owned by {owner}"
            ),
            Self::InsufficientBalance {
                token,
                available,
                requested,
            } => write!(
                f,
                "insufficient balance of token {token}: requested {requested}, available {available}"
            ),
            Self::EmptyTransaction => write!(f, "transaction has no transfers"),
            Self::ProofRejected(reason) => write!(f, "proof rejected: {reason}"),
            Self::ConflictingDeposit { key, recorded } => {
                write!(f, "a different deposit of {recorded} is already recorded at {key}")
            }
            Self::CorruptRecord { key, reason } => write!(f, "corrupt record {key}: {reason}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for LedgerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidRange(e) => Some(e),
            Self::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<InvalidRange> for LedgerError {
    fn from(e: InvalidRange) -> Self {
        Self::InvalidRange(e)
    }
}

impl From<StorageError> for LedgerError {
    fn from(e: StorageError) -> Self {
        Self::Store(e)
    }
}
