//! # SledStore — Persistent Committed Store
//!
//! Application state on disk, built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree    | Key            | Value                                  |
//! |---------|----------------|----------------------------------------|
//! | `state` | raw store key  | raw store value                        |
//! | `meta`  | `last_commit`  | `version` (8B BE) `||` root hash (32B) |
//!
//! ## Atomicity
//!
//! Between commits the pipeline writes into its own buffers; the boundary
//! app hands the whole block's writes to [`CommitStore::write_batch`],
//! which lands them in one sled `Batch`. The commit record is written
//! after the batch and both are flushed before `commit` returns.

use std::path::Path;

use sled::{Batch, Db, Tree};

use super::{CommitInfo, CommitStore, KvPair, KvStore, StoreError, WriteBuffer};
use crate::crypto::hash::{kv_leaf, merkle_root};

const META_LAST_COMMIT: &[u8] = b"last_commit";

#[derive(Debug, Clone)]
pub struct SledStore {
    db: Db,
    state: Tree,
    meta: Tree,
    last: CommitInfo,
}

impl SledStore {
    /// Opens or creates a store at `path`, restoring the last commit.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Self::from_db(sled::open(path)?)
    }

    /// A store that is deleted when dropped.
    pub fn open_temporary() -> Result<Self, StoreError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: Db) -> Result<Self, StoreError> {
        let state = db.open_tree("state")?;
        let meta = db.open_tree("meta")?;
        let last = match meta.get(META_LAST_COMMIT)? {
            Some(raw) => decode_commit(&raw)?,
            None => CommitInfo::default(),
        };
        Ok(Self {
            db,
            state,
            meta,
            last,
        })
    }

    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Merkle root over the current state, in key order.
    pub fn root_hash(&self) -> Result<[u8; 32], StoreError> {
        let mut leaves = Vec::with_capacity(self.state.len());
        for entry in self.state.iter() {
            let (key, value) = entry?;
            leaves.push(kv_leaf(&key, &value));
        }
        Ok(merkle_root(leaves))
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

fn encode_commit(info: &CommitInfo) -> [u8; 40] {
    let mut out = [0u8; 40];
    out[..8].copy_from_slice(&info.version.to_be_bytes());
    out[8..].copy_from_slice(&info.hash);
    out
}

fn decode_commit(raw: &[u8]) -> Result<CommitInfo, StoreError> {
    if raw.len() != 40 {
        return Err(StoreError::Corrupted(format!(
            "commit record has {} bytes, expected 40",
            raw.len()
        )));
    }
    let mut version = [0u8; 8];
    version.copy_from_slice(&raw[..8]);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&raw[8..]);
    Ok(CommitInfo {
        version: u64::from_be_bytes(version),
        hash,
    })
}

impl KvStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.state.get(key)?.map(|v| v.to_vec()))
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        self.state.insert(key, value)?;
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.state.remove(key)?;
        Ok(())
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<KvPair>, StoreError> {
        if end.is_some_and(|end| end <= start) {
            return Ok(Vec::new());
        }
        let iter = match end {
            Some(end) => self.state.range(start..end),
            None => self.state.range(start..),
        };
        let mut out = Vec::new();
        for entry in iter {
            let (key, value) = entry?;
            out.push((key.to_vec(), value.to_vec()));
        }
        Ok(out)
    }
}

impl CommitStore for SledStore {
    fn write_batch(&mut self, writes: WriteBuffer) -> Result<(), StoreError> {
        let mut batch = Batch::default();
        for (key, value) in writes.iter() {
            match value {
                Some(value) => batch.insert(key, value),
                None => batch.remove(key),
            }
        }
        self.state.apply_batch(batch)?;
        Ok(())
    }

    fn commit(&mut self) -> Result<CommitInfo, StoreError> {
        let info = CommitInfo {
            version: self.last.version + 1,
            hash: self.root_hash()?,
        };
        self.meta.insert(META_LAST_COMMIT, &encode_commit(&info)[..])?;
        self.db.flush()?;
        self.last = info;
        Ok(info)
    }

    fn last_commit(&self) -> CommitInfo {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    #[test]
    fn temporary_store_roundtrip() {
        let mut store = SledStore::open_temporary().unwrap();
        assert!(store.is_empty());
        store.set(b"k".to_vec(), b"v".to_vec()).unwrap();
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
        store.delete(b"k").unwrap();
        assert_eq!(store.get(b"k").unwrap(), None);
    }

    #[test]
    fn root_matches_memory_store() {
        let mut disk = SledStore::open_temporary().unwrap();
        let mut mem = MemStore::new();
        for (k, v) in [("b", "2"), ("a", "1"), ("c", "3")] {
            disk.set(k.as_bytes().to_vec(), v.as_bytes().to_vec()).unwrap();
            mem.set(k.as_bytes().to_vec(), v.as_bytes().to_vec()).unwrap();
        }
        assert_eq!(disk.root_hash().unwrap(), mem.root_hash());
        assert_eq!(disk.commit().unwrap().hash, mem.commit().unwrap().hash);
    }

    #[test]
    fn write_batch_applies_sets_and_deletes() {
        let mut store = SledStore::open_temporary().unwrap();
        store.set(b"old".to_vec(), b"x".to_vec()).unwrap();

        let mut staging = MemStore::new();
        let buffer = {
            let mut wrap = crate::store::CacheWrap::new(&mut staging);
            wrap.set(b"new".to_vec(), b"y".to_vec()).unwrap();
            wrap.delete(b"old").unwrap();
            wrap.into_buffer()
        };
        store.write_batch(buffer).unwrap();

        assert_eq!(store.get(b"old").unwrap(), None);
        assert_eq!(store.get(b"new").unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn commit_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state");

        let committed = {
            let mut store = SledStore::open(&path).unwrap();
            store.set(b"cash:alice".to_vec(), b"10".to_vec()).unwrap();
            store.commit().unwrap()
        };
        assert_eq!(committed.version, 1);

        let reopened = SledStore::open(&path).unwrap();
        assert_eq!(reopened.last_commit(), committed);
        assert_eq!(reopened.get(b"cash:alice").unwrap(), Some(b"10".to_vec()));
    }

    #[test]
    fn range_is_ordered_and_bounded() {
        let mut store = SledStore::open_temporary().unwrap();
        for k in ["a", "b", "c", "d"] {
            store.set(k.as_bytes().to_vec(), vec![1]).unwrap();
        }
        let keys: Vec<Vec<u8>> = store
            .range(b"b", Some(&b"d"[..]))
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(store.prefix_scan(b"").unwrap().len(), 4);
    }

    #[test]
    fn corrupted_commit_record_is_reported() {
        assert!(matches!(decode_commit(&[0u8; 3]), Err(StoreError::Corrupted(_))));
        let info = CommitInfo {
            version: 9,
            hash: [7u8; 32],
        };
        assert_eq!(decode_commit(&encode_commit(&info)).unwrap(), info);
    }
}
