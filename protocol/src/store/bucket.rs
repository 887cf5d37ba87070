//! Typed record collections.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::KvStore;
use crate::errors::Result;

/// A named collection of `V` records stored under `"{name}:{id}"` and
/// encoded with bincode.
///
/// ```
/// use loom_protocol::store::{Bucket, MemStore};
///
/// const COUNTERS: Bucket<u64> = Bucket::new("counter");
///
/// let mut store = MemStore::new();
/// COUNTERS.save(&mut store, b"alice", &3).unwrap();
/// assert_eq!(COUNTERS.get(&store, b"alice").unwrap(), Some(3));
/// ```
pub struct Bucket<V> {
    name: &'static str,
    _value: PhantomData<fn() -> V>,
}

impl<V> Bucket<V> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The raw store key for `id`.
    pub fn db_key(&self, id: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.name.len() + 1 + id.len());
        key.extend_from_slice(self.name.as_bytes());
        key.push(b':');
        key.extend_from_slice(id);
        key
    }
}

impl<V: Serialize + DeserializeOwned> Bucket<V> {
    pub fn get(&self, store: &dyn KvStore, id: &[u8]) -> Result<Option<V>> {
        match store.get(&self.db_key(id))? {
            Some(raw) => Ok(Some(bincode::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn save(&self, store: &mut dyn KvStore, id: &[u8], value: &V) -> Result<()> {
        let raw = bincode::serialize(value)?;
        store.set(self.db_key(id), raw)?;
        Ok(())
    }

    pub fn delete(&self, store: &mut dyn KvStore, id: &[u8]) -> Result<()> {
        store.delete(&self.db_key(id))?;
        Ok(())
    }

    /// Every record in the bucket as `(id, value)`, ordered by id.
    pub fn all(&self, store: &dyn KvStore) -> Result<Vec<(Vec<u8>, V)>> {
        let prefix = self.db_key(b"");
        let mut out = Vec::new();
        for (key, raw) in store.prefix_scan(&prefix)? {
            out.push((key[prefix.len()..].to_vec(), bincode::deserialize(&raw)?));
        }
        Ok(out)
    }
}

impl<V> Clone for Bucket<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for Bucket<V> {}

impl<V> fmt::Debug for Bucket<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bucket({})", self.name)
    }
}
