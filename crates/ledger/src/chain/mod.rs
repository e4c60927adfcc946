//! Chain service: turns deposits and transactions into range operations.
//!
//! [`ChainService`] is built from explicit collaborators (store handle,
//! proof checker, configuration) and is `Clone`: every clone shares one
//! [`RangeManager`], so locking is coordinated across clones.
//!
//! # Records
//!
//! ```text
//! deposit:{token}:{start}  -> Deposit JSON      (marks a deposit as applied)
//! tx:{hash}                -> Transaction JSON  (written after all transfers apply)
//! header:{number}          -> BlockHeader JSON
//! meta:latest_block        -> number
//! ```
//!
//! Applying the same deposit or transaction twice is a no-op that reports
//! [`Applied::AlreadyApplied`].

mod proof;
mod types;

pub use proof::{ProofChecker, TrustedProofs};
pub use types::{BlockHeader, Deposit, Hash256, Transaction, Transfer, TxHash};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use config::LedgerConfig;
use config::constants::{BLOCK_HEADER_PREFIX, DEPOSIT_PREFIX, LATEST_BLOCK_KEY, TRANSACTION_PREFIX};
use ledger_core::{Address, Interval, TokenId};
use storage::KeyValueStore;
use tracing::{debug, warn};

use crate::LedgerError;
use crate::range::locks::KeyedLocks;
use crate::range::{PickedRanges, RangeManager, RangeMove, read_json, write_json};

// ---------------------------------------------------------------------------
// Applied
// ---------------------------------------------------------------------------

/// Outcome of applying a deposit or transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Ranges were moved and the record written.
    Applied,
    /// The record already existed; nothing changed.
    AlreadyApplied,
}

// ---------------------------------------------------------------------------
// ChainService
// ---------------------------------------------------------------------------

struct ChainInner<S, P> {
    kv: Arc<S>,
    ranges: RangeManager<S>,
    proofs: P,
    /// Serializes check-apply-record of one deposit or transaction key.
    records: KeyedLocks<String>,
    /// Serializes read-compare-write of `meta:latest_block`.
    latest_block: Mutex<()>,
}

/// Applies deposits and transactions to the range ledger.
pub struct ChainService<S, P = TrustedProofs> {
    inner: Arc<ChainInner<S, P>>,
}

// Manual Clone: S and P need not be Clone.
impl<S, P> Clone for ChainService<S, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, P> ChainService<S, P>
where
    S: KeyValueStore,
    P: ProofChecker,
{
    /// Creates a service over `kv`. No I/O happens here.
    pub fn new(kv: Arc<S>, proofs: P, config: LedgerConfig) -> Self {
        Self {
            inner: Arc::new(ChainInner {
                ranges: RangeManager::new(Arc::clone(&kv), config),
                kv,
                proofs,
                records: KeyedLocks::new(),
                latest_block: Mutex::new(()),
            }),
        }
    }

    /// The underlying range manager.
    pub fn ranges(&self) -> &RangeManager<S> {
        &self.inner.ranges
    }

    // -----------------------------------------------------------------------
    // Deposits
    // -----------------------------------------------------------------------

    /// Credit a deposit's range to its owner.
    ///
    /// Deposits are identified by token and start. Repeating an identical
    /// deposit is reported as [`Applied::AlreadyApplied`] and changes
    /// nothing; a different deposit at the same token and start fails with
    /// [`LedgerError::ConflictingDeposit`].
    pub fn add_deposit(&self, deposit: &Deposit) -> Result<Applied, LedgerError> {
        let key = deposit_key(&deposit.range);
        self.inner.records.with(&key, || -> Result<Applied, LedgerError> {
            if let Some(recorded) = read_json::<Deposit, _>(&*self.inner.kv, &key)? {
                if recorded != *deposit {
                    return Err(LedgerError::ConflictingDeposit {
                        key: key.clone(),
                        recorded: recorded.range,
                    });
                }
                return Ok(Applied::AlreadyApplied);
            }
            self.inner.ranges.add_range(&deposit.owner, deposit.range)?;
            write_json(&*self.inner.kv, &key, deposit)?;

            debug!(
                owner = %deposit.owner,
                range = %deposit.range,
                block = deposit.block,
                "deposit applied"
            );
            Ok(Applied::Applied)
        })
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Apply every transfer of `tx`: remove from sender, add to recipient.
    ///
    /// `proof` is handed to the [`ProofChecker`] first. The transfers are
    /// all-or-nothing: every touched (owner, token) set stays locked until
    /// the transaction record is written, and if any transfer or write
    /// fails no ownership changes.
    pub fn add_transaction(
        &self,
        tx: &Transaction,
        proof: &[u8],
    ) -> Result<Applied, LedgerError> {
        if tx.transfers.is_empty() {
            return Err(LedgerError::EmptyTransaction);
        }
        let hash = tx.hash();
        let key = transaction_key(&hash);

        self.inner.records.with(&key, || -> Result<Applied, LedgerError> {
            if self.inner.kv.exists(key.as_bytes())? {
                return Ok(Applied::AlreadyApplied);
            }
            self.inner.proofs.check(tx, proof)?;

            let moves: Vec<RangeMove> = tx
                .transfers
                .iter()
                .map(|t| RangeMove {
                    from: t.sender,
                    to: t.recipient,
                    interval: t.range,
                })
                .collect();
            self.inner
                .ranges
                .move_ranges(&moves, || write_json(&*self.inner.kv, &key, tx))
                .inspect_err(|e| warn!(%hash, error = %e, "transaction not applied"))?;

            debug!(
                %hash,
                block = tx.block,
                transfers = tx.transfers.len(),
                "transaction applied"
            );
            Ok(Applied::Applied)
        })
    }

    /// Whether a transaction with this hash has been applied.
    pub fn has_transaction(&self, hash: &TxHash) -> Result<bool, LedgerError> {
        Ok(self.inner.kv.exists(transaction_key(hash).as_bytes())?)
    }

    /// The applied transaction with this hash, if any.
    pub fn get_transaction(&self, hash: &TxHash) -> Result<Option<Transaction>, LedgerError> {
        read_json(&*self.inner.kv, &transaction_key(hash))
    }

    // -----------------------------------------------------------------------
    // Block headers
    // -----------------------------------------------------------------------

    /// Store a block header and advance the latest block if it is newer.
    pub fn add_block_header(&self, header: &BlockHeader) -> Result<(), LedgerError> {
        write_json(&*self.inner.kv, &header_key(header.number), header)?;

        let _guard = self
            .inner
            .latest_block
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let latest: Option<u64> = read_json(&*self.inner.kv, LATEST_BLOCK_KEY)?;
        if latest.is_none_or(|n| header.number > n) {
            write_json(&*self.inner.kv, LATEST_BLOCK_KEY, &header.number)?;
        }
        Ok(())
    }

    pub fn get_block_header(&self, number: u64) -> Result<Option<BlockHeader>, LedgerError> {
        read_json(&*self.inner.kv, &header_key(number))
    }

    /// Highest block number a header was stored for.
    pub fn latest_block(&self) -> Result<Option<u64>, LedgerError> {
        read_json(&*self.inner.kv, LATEST_BLOCK_KEY)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Per-token balances of `owner`. Tokens with nothing left are omitted.
    pub fn get_balances(&self, owner: &Address) -> Result<BTreeMap<TokenId, u128>, LedgerError> {
        let mut balances = BTreeMap::new();
        for range in self.inner.ranges.get_owned_ranges(owner)? {
            *balances.entry(range.token()).or_insert(0) += range.width();
        }
        Ok(balances)
    }

    pub fn get_owned_ranges(&self, owner: &Address) -> Result<Vec<Interval>, LedgerError> {
        self.inner.ranges.get_owned_ranges(owner)
    }

    pub fn pick_ranges(
        &self,
        owner: &Address,
        token: TokenId,
        amount: u128,
    ) -> Result<PickedRanges, LedgerError> {
        self.inner.ranges.pick_ranges(owner, token, amount)
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

fn deposit_key(range: &Interval) -> String {
    format!("{DEPOSIT_PREFIX}{}:{}", range.token(), range.start())
}

fn transaction_key(hash: &TxHash) -> String {
    format!("{TRANSACTION_PREFIX}{hash}")
}

fn header_key(number: u64) -> String {
    format!("{BLOCK_HEADER_PREFIX}{number}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
