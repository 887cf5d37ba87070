//! Tags for every key a delivery touched.
//!
//! Indexers subscribe to tags to find the transactions that changed a
//! given record. Each touched key yields one tag, `HEX(key)` mapped to
//! `s` (set) or `d` (deleted), sorted by key and appended to the
//! delivery's own tags. Checks are not tagged.

use std::collections::BTreeMap;

use loom_protocol::app::{CheckResult, Decorator, DeliverResult, Handler, Tag, Tx};
use loom_protocol::context::Context;
use loom_protocol::errors::Result;
use loom_protocol::store::{KvPair, KvStore, StoreError};

pub const SET_VALUE: &[u8] = b"s";
pub const DELETE_VALUE: &[u8] = b"d";

#[derive(Debug, Clone, Copy, Default)]
pub struct KeyTagger;

impl KeyTagger {
    pub fn new() -> Self {
        Self
    }
}

/// Passes everything through to `inner` and remembers the last operation
/// on every key.
struct Recording<'a> {
    inner: &'a mut dyn KvStore,
    touched: BTreeMap<Vec<u8>, bool>,
}

impl KvStore for Recording<'_> {
    fn get(&self, key: &[u8]) -> std::result::Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key)
    }

    fn set(&mut self, key: Vec<u8>, value: Vec<u8>) -> std::result::Result<(), StoreError> {
        self.touched.insert(key.clone(), true);
        self.inner.set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> std::result::Result<(), StoreError> {
        self.touched.insert(key.to_vec(), false);
        self.inner.delete(key)
    }

    fn range(
        &self,
        start: &[u8],
        end: Option<&[u8]>,
    ) -> std::result::Result<Vec<KvPair>, StoreError> {
        self.inner.range(start, end)
    }
}

impl<T: Tx> Decorator<T> for KeyTagger {
    fn name(&self) -> &'static str {
        "keytagger"
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        next.check(ctx, store, tx)
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        let mut recording = Recording {
            inner: store,
            touched: BTreeMap::new(),
        };
        let mut res = next.deliver(ctx, &mut recording, tx)?;
        res.tags.extend(recording.touched.into_iter().map(|(key, set)| {
            let value = if set { SET_VALUE } else { DELETE_VALUE };
            Tag::new(hex::encode_upper(key), value)
        }));
        Ok(res)
    }
}
