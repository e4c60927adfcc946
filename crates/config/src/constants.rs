//! Storage layout constants.
//!
//! Key prefixes for every record kind the ledger writes. Prefixes end in
//! `:` and no prefix is a prefix of another, so keys of different kinds
//! never collide.

/// Range set of one (owner, token): `ranges:{owner}:{token}`.
pub const RANGES_PREFIX: &str = "ranges:";

/// Token index of one owner: `tokens:{owner}`.
pub const TOKEN_INDEX_PREFIX: &str = "tokens:";

/// Applied transaction record: `tx:{hash}`.
pub const TRANSACTION_PREFIX: &str = "tx:";

/// Applied deposit marker: `deposit:{token}:{start}`.
pub const DEPOSIT_PREFIX: &str = "deposit:";

/// Block header record: `header:{number}`.
pub const BLOCK_HEADER_PREFIX: &str = "header:";

/// Highest block number seen so far.
pub const LATEST_BLOCK_KEY: &str = "meta:latest_block";

/// Default LMDB map size (256 MiB, grows lazily on disk).
pub const DEFAULT_LMDB_MAP_SIZE: usize = 256 * 1024 * 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes_are_disjoint() {
        let prefixes = [
            RANGES_PREFIX,
            TOKEN_INDEX_PREFIX,
            TRANSACTION_PREFIX,
            DEPOSIT_PREFIX,
            BLOCK_HEADER_PREFIX,
            LATEST_BLOCK_KEY,
        ];
        for (i, a) in prefixes.iter().enumerate() {
            for (j, b) in prefixes.iter().enumerate() {
                if i != j {
                    assert!(!b.starts_with(a), "{a} is a prefix of {b}");
                }
            }
        }
    }
}
