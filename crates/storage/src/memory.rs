//! In-memory key-value store backed by `RwLock<HashMap>`.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::{KeyValueStore, StorageError};

// ---------------------------------------------------------------------------
// InMemoryKvStore
// ---------------------------------------------------------------------------

/// In-memory store for development and testing.
///
/// Nothing survives the process. Reads take a shared lock, writes an
/// exclusive one.
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKvStore {
    /// Creates an empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    /// Returns `true` if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for InMemoryKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.entries.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.entries.read().unwrap().contains_key(key))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_is_none() {
        let store = InMemoryKvStore::new();
        assert_eq!(store.get(b"nope").unwrap(), None);
        assert!(!store.exists(b"nope").unwrap());
    }

    #[test]
    fn set_then_get() {
        let store = InMemoryKvStore::new();
        store.set(b"k", b"v1").unwrap();
        assert_eq!(store.get(b"k").unwrap().as_deref(), Some(&b"v1"[..]));
        assert!(store.exists(b"k").unwrap());
    }

    #[test]
    fn set_overwrites() {
        let store = InMemoryKvStore::new();
        store.set(b"k", b"v1").unwrap();
        store.set(b"k", b"v2").unwrap();
        assert_eq!(store.get(b"k").unwrap().as_deref(), Some(&b"v2"[..]));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn empty_value_still_exists() {
        let store = InMemoryKvStore::new();
        store.set(b"k", b"").unwrap();
        assert!(store.exists(b"k").unwrap());
        assert!(!store.is_empty());
    }
}
