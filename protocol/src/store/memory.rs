//! In-memory committed store.
//!
//! State lives in a `BTreeMap`, so iteration is always in key order. The
//! root hash is a binary Merkle root over the sorted entries:
//!
//! ```text
//! leaves = [ BLAKE3(len(key) || key || value) for (key, value) in sorted(state) ]
//! root   = merkle_root(leaves)
//! ```
//!
//! Used by tests and by the node's `--in-memory` replay mode.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::{CommitInfo, CommitStore, KvPair, KvStore, StoreError};
use crate::crypto::hash::{kv_leaf, merkle_root};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    last: CommitInfo,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Merkle root of the current (possibly uncommitted) state. An empty
    /// store hashes to all zeros.
    pub fn root_hash(&self) -> [u8; 32] {
        merkle_root(self.data.iter().map(|(k, v)| kv_leaf(k, v)).collect())
    }
}

impl KvStore for MemStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        self.data.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.data.remove(key);
        Ok(())
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<KvPair>, StoreError> {
        if end.is_some_and(|end| end <= start) {
            return Ok(Vec::new());
        }
        let upper = match end {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        Ok(self
            .data
            .range::<[u8], _>((Bound::Included(start), upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl CommitStore for MemStore {
    fn commit(&mut self) -> Result<CommitInfo, StoreError> {
        self.last = CommitInfo {
            version: self.last.version + 1,
            hash: self.root_hash(),
        };
        Ok(self.last)
    }

    fn last_commit(&self) -> CommitInfo {
        self.last
    }
}
