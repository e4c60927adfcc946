//! The range manager: every mutation of an owner's ranges goes through here.
//!
//! Each add or remove is a read-modify-write of one stored set, run inside
//! the (owner, token) critical section:
//!
//! 1. lock (owner, token)
//! 2. load the set
//! 3. compute the new set in memory
//! 4. write it back
//! 5. unlock (on every exit path)
//!
//! Nothing is written unless step 3 succeeds, so a failed call leaves the
//! stored set as it was. Different (owner, token) pairs never contend.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;

use config::LedgerConfig;
use ledger_core::{Address, Interval, TokenId};
use storage::KeyValueStore;
use tracing::{debug, error, warn};

use super::locks::KeyedLocks;
use super::selection::{PickedRanges, pick_ascending};
use super::set::{Conflict, Insertion, OwnerRangeSet};
use super::store::RangeStore;
use crate::LedgerError;

// ---------------------------------------------------------------------------
// RangeMove
// ---------------------------------------------------------------------------

/// One interval changing hands in [`RangeManager::move_ranges`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeMove {
    pub from: Address,
    pub to: Address,
    pub interval: Interval,
}

// ---------------------------------------------------------------------------
// RangeManager
// ---------------------------------------------------------------------------

/// Adds, removes, queries and picks ranges for owners.
///
/// Thread-safe: share it behind an `Arc` (or inside a
/// [`crate::chain::ChainService`]) and call from any number of threads.
pub struct RangeManager<S> {
    store: RangeStore<S>,
    config: LedgerConfig,
    /// Serializes read-modify-write of one range set.
    set_locks: KeyedLocks<(Address, TokenId)>,
    /// Serializes updates of one owner's token index. Always taken inside
    /// a set lock, never the other way round.
    index_locks: KeyedLocks<Address>,
}

impl<S: KeyValueStore> RangeManager<S> {
    /// Creates a manager over a shared store handle.
    pub fn new(kv: Arc<S>, config: LedgerConfig) -> Self {
        Self {
            store: RangeStore::new(kv),
            config,
            set_locks: KeyedLocks::new(),
            index_locks: KeyedLocks::new(),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &RangeStore<S> {
        &self.store
    }

    /// Give `interval` (of `interval.token()`) to `owner`.
    ///
    /// Coalesces with touching intervals. Intersections follow the
    /// configured [`config::OverlapPolicy`]. Returns the updated set.
    ///
    /// # Errors
    ///
    /// [`LedgerError::OverlappingRange`] under `Reject`;
    /// [`LedgerError::CorruptRecord`] or [`LedgerError::Store`] from storage.
    pub fn add_range(
        &self,
        owner: &Address,
        interval: Interval,
    ) -> Result<OwnerRangeSet, LedgerError> {
        let token = interval.token();
        self.set_locks.with(&(*owner, token), || {
            let mut set = self.store.load(owner, token)?;
            let first_for_token = set.is_empty();

            let insertion = self.insert_into(owner, &mut set, interval)?;
            self.persist(owner, &set, first_for_token)?;

            debug!(
                %owner,
                added = %interval,
                merged = %insertion.merged,
                absorbed = insertion.absorbed,
                ranges = set.len(),
                "range added"
            );
            Ok(set)
        })
    }

    /// Take `interval` away from `owner`.
    ///
    /// The interval must lie inside one owned interval, which is deleted,
    /// shrunk or split. Returns the updated set.
    ///
    /// # Errors
    ///
    /// [`LedgerError::RangeNotOwned`] if no single owned interval contains
    /// it; storage errors as for [`Self::add_range`].
    pub fn remove_range(
        &self,
        owner: &Address,
        interval: Interval,
    ) -> Result<OwnerRangeSet, LedgerError> {
        let token = interval.token();
        self.set_locks.with(&(*owner, token), || {
            let mut set = self.store.load(owner, token)?;
            set.remove(&interval)
                .map_err(|_| LedgerError::RangeNotOwned {
                    owner: *owner,
                    interval,
                })?;
            self.store.save(owner, &set)?;

            debug!(%owner, removed = %interval, ranges = set.len(), "range removed");
            Ok(set)
        })
    }

    /// Apply `moves` in order as one unit, then run `commit`.
    ///
    /// Every (owner, token) set the moves touch stays locked for the whole
    /// call, taken in ascending key order. Moves are applied to in-memory
    /// copies and nothing is written unless all of them succeed. `commit`
    /// runs after the sets are written, before the locks are released; if
    /// a write or `commit` fails, every written set is put back as it was
    /// loaded.
    ///
    /// # Errors
    ///
    /// The first failing move's error ([`LedgerError::RangeNotOwned`],
    /// [`LedgerError::OverlappingRange`]), a storage error, or the error
    /// returned by `commit`.
    pub fn move_ranges<F>(&self, moves: &[RangeMove], commit: F) -> Result<(), LedgerError>
    where
        F: FnOnce() -> Result<(), LedgerError>,
    {
        let mut keys: Vec<(Address, TokenId)> = moves
            .iter()
            .flat_map(|m| [(m.from, m.interval.token()), (m.to, m.interval.token())])
            .collect();
        keys.sort();
        keys.dedup();

        self.set_locks.with_all(&keys, || -> Result<(), LedgerError> {
            let mut staged = BTreeMap::new();
            for m in moves {
                let token = m.interval.token();
                self.stage(&mut staged, m.from, token)?
                    .remove(&m.interval)
                    .map_err(|_| LedgerError::RangeNotOwned {
                        owner: m.from,
                        interval: m.interval,
                    })?;
                let set = self.stage(&mut staged, m.to, token)?;
                self.insert_into(&m.to, set, m.interval)?;
            }

            let mut written = Vec::new();
            let outcome = self
                .write_staged(&staged, &mut written)
                .and_then(|()| commit());
            if let Err(e) = outcome {
                warn!(error = %e, sets = written.len(), "range move not committed, restoring");
                for (owner, token) in &written {
                    if let Err(restore) = self.store.save(owner, &staged[&(*owner, *token)].before) {
                        error!(%owner, %token, error = %restore, "failed to restore range set");
                    }
                }
                return Err(e);
            }

            debug!(moves = moves.len(), sets = written.len(), "ranges moved");
            Ok(())
        })
    }

    /// The set of (`owner`, `token`), read under its lock.
    pub fn owned_ranges(
        &self,
        owner: &Address,
        token: TokenId,
    ) -> Result<OwnerRangeSet, LedgerError> {
        self.set_locks
            .with(&(*owner, token), || self.store.load(owner, token))
    }

    /// Every interval `owner` holds, grouped by ascending token id, each
    /// group ascending by start.
    pub fn get_owned_ranges(&self, owner: &Address) -> Result<Vec<Interval>, LedgerError> {
        let mut all = Vec::new();
        for token in self.store.tokens(owner)? {
            all.extend(self.owned_ranges(owner, token)?.into_vec());
        }
        Ok(all)
    }

    /// Sum of widths `owner` holds of `token`.
    pub fn balance(&self, owner: &Address, token: TokenId) -> Result<u128, LedgerError> {
        Ok(self.owned_ranges(owner, token)?.total())
    }

    /// Select whole intervals of `token`, ascending by start, until they
    /// cover `amount`.
    ///
    /// Nothing is reserved: the caller removes what it spends.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidAmount`] for zero,
    /// [`LedgerError::InsufficientBalance`] if the owner holds too little.
    pub fn pick_ranges(
        &self,
        owner: &Address,
        token: TokenId,
        amount: u128,
    ) -> Result<PickedRanges, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let set = self.owned_ranges(owner, token)?;
        pick_ascending(set.as_slice(), amount).ok_or(LedgerError::InsufficientBalance {
            token,
            available: set.total(),
            requested: amount,
        })
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

/// A set as loaded, and as changed by the moves so far.
struct Staged {
    before: OwnerRangeSet,
    after: OwnerRangeSet,
}

impl<S: KeyValueStore> RangeManager<S> {
    /// Insert under the configured policy, logging absorbed overlaps.
    fn insert_into(
        &self,
        owner: &Address,
        set: &mut OwnerRangeSet,
        interval: Interval,
    ) -> Result<Insertion, LedgerError> {
        let insertion = set
            .insert(interval, self.config.overlap_policy)
            .map_err(|Conflict(existing)| LedgerError::OverlappingRange {
                owner: *owner,
                interval,
                existing,
            })?;

        if insertion.overlapped {
            warn!(
                %owner,
                token = %interval.token(),
                added = %interval,
                merged = %insertion.merged,
                "overlapping range absorbed"
            );
        }
        Ok(insertion)
    }

    /// Write `set`, listing its token in the owner's index first if new.
    fn persist(
        &self,
        owner: &Address,
        set: &OwnerRangeSet,
        first_for_token: bool,
    ) -> Result<(), LedgerError> {
        // Index first: a token listed with an empty set is harmless, a
        // stored set missing from the index is invisible.
        if first_for_token {
            self.index_locks
                .with(owner, || self.store.register_token(owner, set.token()))?;
        }
        self.store.save(owner, set)
    }

    /// The working copy of (`owner`, `token`), loaded on first use.
    fn stage<'a>(
        &self,
        staged: &'a mut BTreeMap<(Address, TokenId), Staged>,
        owner: Address,
        token: TokenId,
    ) -> Result<&'a mut OwnerRangeSet, LedgerError> {
        let entry = match staged.entry((owner, token)) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let before = self.store.load(&owner, token)?;
                e.insert(Staged {
                    after: before.clone(),
                    before,
                })
            }
        };
        Ok(&mut entry.after)
    }

    /// Persist every changed set, recording each key once written.
    fn write_staged(
        &self,
        staged: &BTreeMap<(Address, TokenId), Staged>,
        written: &mut Vec<(Address, TokenId)>,
    ) -> Result<(), LedgerError> {
        for (&(owner, token), set) in staged {
            if set.before == set.after {
                continue;
            }
            self.persist(&owner, &set.after, set.before.is_empty())?;
            written.push((owner, token));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
