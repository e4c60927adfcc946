//! LMDB-backed [`KeyValueStore`] using heed.
//!
//! One environment, one named database (`"ledger"`). Every `set` runs in
//! its own write transaction, so each call is durable once it returns.

use std::fs;
use std::path::Path;

use heed::types::Bytes as HeedBytes;
use heed::{Database, Env, EnvOpenOptions, MdbError};

use crate::{KeyValueStore, StorageError};

const DATABASE_NAME: &str = "ledger";

// ---------------------------------------------------------------------------
// HeedKvStore
// ---------------------------------------------------------------------------

/// LMDB key-value store.
pub struct HeedKvStore {
    env: Env,
    db: Database<HeedBytes, HeedBytes>,
}

impl HeedKvStore {
    /// Open or create the LMDB environment at `path`.
    ///
    /// Creates the directory if needed. `map_size` is the maximum size the
    /// memory map may grow to; the file on disk grows lazily.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, StorageError> {
        fs::create_dir_all(path)
            .map_err(|e| StorageError::Unavailable(format!("{}: {e}", path.display())))?;

        // SAFETY: the environment is opened once per directory by this
        // process and never concurrently with another handle to it.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(1)
                .open(path)
                .map_err(map_heed_error)?
        };

        let mut wtxn = env.write_txn().map_err(map_heed_error)?;
        let db: Database<HeedBytes, HeedBytes> = env
            .create_database(&mut wtxn, Some(DATABASE_NAME))
            .map_err(map_heed_error)?;
        wtxn.commit().map_err(map_heed_error)?;

        tracing::debug!(path = %path.display(), map_size, "opened lmdb store");

        Ok(Self { env, db })
    }
}

impl KeyValueStore for HeedKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let rtxn = self.env.read_txn().map_err(map_heed_error)?;
        let value = self.db.get(&rtxn, key).map_err(map_heed_error)?;
        Ok(value.map(<[u8]>::to_vec))
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        let mut wtxn = self.env.write_txn().map_err(map_heed_error)?;
        self.db.put(&mut wtxn, key, value).map_err(map_heed_error)?;
        wtxn.commit().map_err(map_heed_error)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        let rtxn = self.env.read_txn().map_err(map_heed_error)?;
        Ok(self.db.get(&rtxn, key).map_err(map_heed_error)?.is_some())
    }
}

fn map_heed_error(err: heed::Error) -> StorageError {
    match err {
        heed::Error::Io(e) => StorageError::Unavailable(e.to_string()),
        heed::Error::Mdb(MdbError::MapFull) => StorageError::WriteRejected("map full".into()),
        heed::Error::Mdb(MdbError::Panic) => StorageError::Unavailable("environment panicked".into()),
        heed::Error::Encoding(e) | heed::Error::Decoding(e) => {
            StorageError::Serialization(e.to_string())
        }
        other => StorageError::Internal(Box::new(other)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MAP_SIZE: usize = 16 * 1024 * 1024;

    #[test]
    fn set_get_exists() {
        let dir = tempfile::tempdir().unwrap();
        let store = HeedKvStore::open(dir.path(), MAP_SIZE).unwrap();

        assert_eq!(store.get(b"a").unwrap(), None);
        assert!(!store.exists(b"a").unwrap());

        store.set(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(store.exists(b"a").unwrap());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = HeedKvStore::open(dir.path(), MAP_SIZE).unwrap();
            store.set(b"ranges:x", b"[]").unwrap();
        }
        let store = HeedKvStore::open(dir.path(), MAP_SIZE).unwrap();
        assert_eq!(store.get(b"ranges:x").unwrap(), Some(b"[]".to_vec()));
    }
}
