//! Persistence primitives for the range ledger.
//!
//! The ledger treats storage as an external collaborator with a deliberately
//! narrow surface: [`KeyValueStore`] exposes `get`, `set` and `exists` over
//! opaque byte values. Record layouts (range sets, transactions, headers)
//! are owned by the crates that define those domain types, so this crate
//! never depends on ledger models.
//!
//! # Backends
//!
//! - [`InMemoryKvStore`]: `RwLock<HashMap>`, for tests and ephemeral nodes.
//! - `HeedKvStore` (feature `lmdb`): LMDB via heed, one named database.

mod error;
#[cfg(feature = "lmdb")]
mod heed_store;
mod kv;
mod memory;

pub use error::StorageError;
#[cfg(feature = "lmdb")]
pub use heed_store::HeedKvStore;
pub use kv::KeyValueStore;
pub use memory::InMemoryKvStore;
