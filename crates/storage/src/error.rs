//! Storage error type shared by every [`crate::KeyValueStore`] backend.

use std::fmt;

/// Failures surfaced by a key-value backend.
///
/// These describe the backend, not the caller's input: a missing key is
/// `Ok(None)` from `get`, never an error. The ledger passes these through
/// to its own caller unchanged and performs no retries.
#[derive(Debug)]
pub enum StorageError {
    /// The backend could not be opened or is no longer reachable.
    Unavailable(String),

    /// The operation exceeded its deadline.
    Timeout,

    /// A write was refused (map full, read-only environment, quota).
    WriteRejected(String),

    /// Encoding or decoding a stored value failed.
    Serialization(String),

    /// An unclassified backend error. Inspect the inner error for details.
    Internal(Box<dyn std::error::Error + Send + Sync>),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(reason) => write!(f, "store unavailable: {reason}"),
            Self::Timeout => write!(f, "store operation timed out"),
            Self::WriteRejected(reason) => write!(f, "store write rejected: {reason}"),
            Self::Serialization(detail) => write!(f, "store serialization error: {detail}"),
            Self::Internal(e) => write!(f, "internal store error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_reason() {
        let err = StorageError::Unavailable("disk detached".into());
        assert_eq!(err.to_string(), "store unavailable: disk detached");
    }

    #[test]
    fn internal_exposes_source() {
        let inner = std::io::Error::other("boom");
        let err = StorageError::Internal(Box::new(inner));
        assert!(std::error::Error::source(&err).is_some());
        assert!(std::error::Error::source(&StorageError::Timeout).is_none());
    }
}
