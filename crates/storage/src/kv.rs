//! The key-value contract the ledger persists through.

use crate::StorageError;

/// Byte-oriented key-value storage.
///
/// Implementations must be `Send + Sync`: one store handle is shared by
/// every ledger component for the lifetime of the hosting process. Each
/// call is individually atomic; read-modify-write sequences are serialized
/// by the caller.
pub trait KeyValueStore: Send + Sync {
    /// Load the value stored under `key`, or `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Whether a value is stored under `key`.
    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        (**self).exists(key)
    }
}
