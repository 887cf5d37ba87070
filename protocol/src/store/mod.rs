//! # Store Module
//!
//! Key/value state for the transaction pipeline.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs        — KvStore / CommitStore traits, StoreError
//! cache.rs      — CacheWrap: savepoint over any KvStore, commit or drop
//! memory.rs     — MemStore: BTreeMap-backed committed store
//! sled_store.rs — SledStore: sled-backed committed store
//! bucket.rs     — Bucket<V>: typed, prefixed, bincode-encoded records
//! ```
//!
//! ## Savepoints
//!
//! Every pipeline stage receives `&mut dyn KvStore`. A stage that needs
//! all-or-nothing semantics wraps it in a [`CacheWrap`], hands the wrap to
//! its continuation, and then either commits the wrap into the parent or
//! drops it. The wrap holds the parent's mutable borrow for its whole
//! lifetime, so nothing can write around it and nothing can keep the
//! handle after the call returns.
//!
//! ```text
//!   committed store ◄── BaseApp deliver buffer ◄── savepoint ◄── savepoint ...
//! ```

pub mod bucket;
pub mod cache;
pub mod memory;
pub mod sled_store;

pub use self::bucket::Bucket;
pub use self::cache::{CacheWrap, WriteBuffer};
pub use self::memory::MemStore;
pub use self::sled_store::SledStore;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::Error;

/// A key/value pair returned by range scans.
pub type KvPair = (Vec<u8>, Vec<u8>);

/// Errors raised by store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("corrupted store: {0}")]
    Corrupted(String),
}

impl From<StoreError> for Error {
    #[track_caller]
    fn from(err: StoreError) -> Self {
        Error::internal(format!("store: {}", err))
    }
}

/// Read/write access to ordered key/value state.
pub trait KvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError>;

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// Entries with `start <= key < end` in ascending key order. `None`
    /// means no upper bound.
    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<KvPair>, StoreError>;

    fn has(&self, key: &[u8]) -> Result<bool, StoreError> {
        Ok(self.get(key)?.is_some())
    }

    /// Entries whose key starts with `prefix`.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<Vec<KvPair>, StoreError> {
        let end = prefix_end(prefix);
        self.range(prefix, end.as_deref())
    }
}

/// Version and root hash produced by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommitInfo {
    pub version: u64,
    pub hash: [u8; 32],
}

/// A store that persists versions of its state.
pub trait CommitStore: KvStore {
    /// Applies a set of pending writes. Backends with native batches
    /// apply them atomically.
    fn write_batch(&mut self, writes: WriteBuffer) -> Result<(), StoreError>
    where
        Self: Sized,
    {
        writes.apply_to(self)
    }

    /// Seals the current state as a new version.
    fn commit(&mut self) -> Result<CommitInfo, StoreError>;

    /// The last committed version, or the default for a fresh store.
    fn last_commit(&self) -> CommitInfo;
}

/// Smallest key greater than every key starting with `prefix`, or `None`
/// if no such key exists (the prefix is empty or all `0xff`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
