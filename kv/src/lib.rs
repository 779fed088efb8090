//! Key-value persistence backend.
//!
//! A [`KVStore`] maps string keys to opaque byte values. Mutations are
//! grouped into a [`Batch`] that is applied atomically: either every
//! operation in the batch becomes visible, or none does. The durable
//! implementation ([`RedbStore`]) commits each batch as one redb write
//! transaction, so a successful [`KVStore::write`] is already on disk.
//!
//! [`MemoryStore`] keeps everything in a `BTreeMap` and is meant for tests
//! and ephemeral sessions.

mod batch;
pub mod memory;
pub mod redb;

use std::fmt;

use thiserror::Error;

pub use batch::{Batch, Op};
pub use memory::MemoryStore;
pub use self::redb::RedbStore;

/// Errors that can occur in KV store operations.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv: storage error: {0}")]
    Storage(String),
}

/// Result type for KV operations.
pub type KVResult<T> = Result<T, KVError>;

/// Key-value store with prefix scans and atomic batches.
///
/// Implementations must be safe for concurrent use.
pub trait KVStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>>;

    /// Return every entry whose key starts with `prefix`, in ascending key order.
    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>>;

    /// Apply all operations of `batch` atomically, in order.
    fn write(&self, batch: Batch) -> KVResult<()>;

    /// Set a single key.
    fn put(&self, key: &str, value: &[u8]) -> KVResult<()> {
        let mut batch = Batch::new();
        batch.put(key, value);
        self.write(batch)
    }

    /// Delete a single key. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> KVResult<()> {
        let mut batch = Batch::new();
        batch.delete(key);
        self.write(batch)
    }
}

impl fmt::Debug for dyn KVStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KVStore {{ ... }}")
    }
}
