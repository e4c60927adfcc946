//! Range set persistence on top of a [`KeyValueStore`].
//!
//! # Schema
//!
//! ```text
//! ranges:{owner}:{token}  -> [["start","end"], ...]   sorted, disjoint, non-adjacent
//! tokens:{owner}          -> ["token", ...]           ascending, no duplicates
//! ```
//!
//! `{owner}` is the fixed-width `0x` hex address and `{token}` the decimal
//! token id, so keys are unique per (owner, token). Bounds are decimal
//! strings. An empty set is stored as `[]`, never deleted.
//!
//! Records are validated on load. A record that decodes but breaks the set
//! invariants is reported as [`LedgerError::CorruptRecord`] and never
//! repaired here.

use std::sync::Arc;

use config::constants::{RANGES_PREFIX, TOKEN_INDEX_PREFIX};
use ledger_core::{Address, Interval, TokenId};
use serde::Serialize;
use serde::de::DeserializeOwned;
use storage::{KeyValueStore, StorageError};

use super::set::OwnerRangeSet;
use crate::LedgerError;

/// Storage key of the range set of (`owner`, `token`).
pub fn range_key(owner: &Address, token: TokenId) -> String {
    format!("{RANGES_PREFIX}{owner}:{token}")
}

/// Storage key of `owner`'s token index.
pub fn token_index_key(owner: &Address) -> String {
    format!("{TOKEN_INDEX_PREFIX}{owner}")
}

// ---------------------------------------------------------------------------
// RangeStore
// ---------------------------------------------------------------------------

/// Loads and saves [`OwnerRangeSet`]s. Owns their byte representation.
///
/// Performs no locking: read-modify-write sequences are serialized by
/// [`super::RangeManager`].
pub struct RangeStore<S> {
    kv: Arc<S>,
}

impl<S: KeyValueStore> RangeStore<S> {
    pub fn new(kv: Arc<S>) -> Self {
        Self { kv }
    }

    /// The shared store handle.
    pub fn kv(&self) -> &Arc<S> {
        &self.kv
    }

    /// Load the set of (`owner`, `token`), empty if never written.
    pub fn load(&self, owner: &Address, token: TokenId) -> Result<OwnerRangeSet, LedgerError> {
        let key = range_key(owner, token);
        let Some(pairs) = read_json::<Vec<[String; 2]>, _>(&*self.kv, &key)? else {
            return Ok(OwnerRangeSet::new(token));
        };

        let corrupt = |reason: String| LedgerError::CorruptRecord {
            key: key.clone(),
            reason,
        };

        let ranges = pairs
            .iter()
            .map(|[start, end]| Interval::parse(token, start, end))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| corrupt(e.to_string()))?;

        OwnerRangeSet::from_sorted(token, ranges).map_err(corrupt)
    }

    /// Persist `set` for `owner`, replacing the previous record.
    pub fn save(&self, owner: &Address, set: &OwnerRangeSet) -> Result<(), LedgerError> {
        let pairs: Vec<[String; 2]> = set
            .iter()
            .map(|r| [r.start().to_string(), r.end().to_string()])
            .collect();
        write_json(&*self.kv, &range_key(owner, set.token()), &pairs)
    }

    /// Tokens `owner` has ever held, ascending.
    pub fn tokens(&self, owner: &Address) -> Result<Vec<TokenId>, LedgerError> {
        let key = token_index_key(owner);
        let tokens: Vec<TokenId> = read_json(&*self.kv, &key)?.unwrap_or_default();
        if tokens.windows(2).any(|w| w[0] >= w[1]) {
            return Err(LedgerError::CorruptRecord {
                key,
                reason: "token index is not strictly ascending".into(),
            });
        }
        Ok(tokens)
    }

    /// Add `token` to `owner`'s index. Returns `false` if already present.
    ///
    /// The caller serializes index updates per owner.
    pub fn register_token(&self, owner: &Address, token: TokenId) -> Result<bool, LedgerError> {
        let mut tokens = self.tokens(owner)?;
        match tokens.binary_search(&token) {
            Ok(_) => Ok(false),
            Err(pos) => {
                tokens.insert(pos, token);
                write_json(&*self.kv, &token_index_key(owner), &tokens)?;
                Ok(true)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// JSON helpers
// ---------------------------------------------------------------------------

/// Read and decode a JSON record. Decode failures are corrupt records.
pub(crate) fn read_json<T, S>(kv: &S, key: &str) -> Result<Option<T>, LedgerError>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(bytes) = kv.get(key.as_bytes())? else {
        return Ok(None);
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| LedgerError::CorruptRecord {
            key: key.to_owned(),
            reason: e.to_string(),
        })
}

/// Encode and write a JSON record.
pub(crate) fn write_json<T, S>(kv: &S, key: &str, value: &T) -> Result<(), LedgerError>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let bytes =
        serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
    kv.set(key.as_bytes(), &bytes)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
