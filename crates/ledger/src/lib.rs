//! Range ownership ledger.
//!
//! Tracks which account owns which half-open ranges `[start, end)` of each
//! token. Deposits and incoming transfers add ranges, outgoing transfers
//! remove them, and spends pick a covering set of whole ranges.
//!
//! # Layers
//!
//! - [`range::OwnerRangeSet`]: the sorted, non-overlapping, non-adjacent
//!   intervals of one (owner, token). Pure in-memory algorithms.
//! - [`range::RangeStore`]: record format and keys on top of a
//!   [`storage::KeyValueStore`].
//! - [`range::RangeManager`]: add / remove / query / pick, each inside a
//!   per-(owner, token) critical section.
//! - [`chain::ChainService`]: applies deposits and transactions, records
//!   transactions and block headers, reports balances.
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use config::LedgerConfig;
//! use ledger::chain::{ChainService, Deposit, TrustedProofs};
//! use ledger_core::{Address, Interval, TokenId};
//! use storage::InMemoryKvStore;
//!
//! # fn main() -> Result<(), ledger::LedgerError> {
//! let chain = ChainService::new(
//!     Arc::new(InMemoryKvStore::new()),
//!     TrustedProofs,
//!     LedgerConfig::DEFAULT,
//! );
//!
//! let bob = Address::from_bytes([0xb0; 20]);
//! let range = Interval::new(TokenId(0), 0, 100)?;
//! chain.add_deposit(&Deposit { owner: bob, range, block: 1 })?;
//!
//! let picked = chain.pick_ranges(&bob, TokenId(0), 40)?;
//! assert_eq!(picked.total, 100);
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod error;
pub mod range;

pub use error::LedgerError;
