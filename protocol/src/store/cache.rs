//! Savepoints.

use std::collections::BTreeMap;
use std::ops::Bound;

use super::{KvPair, KvStore, StoreError};

/// Pending writes, keyed in order. `None` marks a deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBuffer {
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl WriteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Pending writes in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Option<&[u8]>)> {
        self.writes
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_deref()))
    }

    /// Replays every pending write onto `target`, in key order.
    pub fn apply_to(self, target: &mut dyn KvStore) -> Result<(), StoreError> {
        for (key, value) in self.writes {
            match value {
                Some(value) => target.set(key, value)?,
                None => target.delete(&key)?,
            }
        }
        Ok(())
    }

    pub fn into_inner(self) -> BTreeMap<Vec<u8>, Option<Vec<u8>>> {
        self.writes
    }
}

/// A savepoint over a parent store.
///
/// Reads fall through to the parent unless shadowed by a pending write.
/// [`commit`](Self::commit) replays the pending writes onto the parent;
/// dropping the wrap (or calling [`rollback`](Self::rollback)) discards
/// them without the parent ever observing them.
///
/// ```
/// use loom_protocol::store::{CacheWrap, KvStore, MemStore};
///
/// let mut store = MemStore::new();
/// {
///     let mut wrap = CacheWrap::new(&mut store);
///     wrap.set(b"k".to_vec(), b"v".to_vec()).unwrap();
///     wrap.rollback();
/// }
/// assert_eq!(store.get(b"k").unwrap(), None);
/// ```
pub struct CacheWrap<'a> {
    parent: &'a mut dyn KvStore,
    buffer: WriteBuffer,
}

impl<'a> CacheWrap<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self::resume(parent, WriteBuffer::new())
    }

    /// Re-opens a savepoint with writes kept from an earlier wrap over the
    /// same parent.
    pub fn resume(parent: &'a mut dyn KvStore, buffer: WriteBuffer) -> Self {
        Self { parent, buffer }
    }

    /// Writes all pending changes into the parent.
    pub fn commit(self) -> Result<(), StoreError> {
        self.buffer.apply_to(self.parent)
    }

    /// Discards all pending changes.
    pub fn rollback(self) {}

    /// Releases the parent and returns the pending writes.
    pub fn into_buffer(self) -> WriteBuffer {
        self.buffer
    }

    pub fn pending(&self) -> &WriteBuffer {
        &self.buffer
    }
}

impl KvStore for CacheWrap<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match self.buffer.writes.get(key) {
            Some(pending) => Ok(pending.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), StoreError> {
        self.buffer.writes.insert(key, Some(value));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.buffer.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<KvPair>, StoreError> {
        if end.is_some_and(|end| end <= start) {
            return Ok(Vec::new());
        }

        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.range(start, end)?.into_iter().collect();

        let upper = match end {
            Some(end) => Bound::Excluded(end),
            None => Bound::Unbounded,
        };
        for (key, pending) in self
            .buffer
            .writes
            .range::<[u8], _>((Bound::Included(start), upper))
        {
            match pending {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}
