//! Handlers, decorators and their results.

use serde::{Deserialize, Serialize};

use crate::coin::Coin;
use crate::context::Context;
use crate::errors::Result;
use crate::store::KvStore;

/// A decoded transaction. The path selects the handler the router
/// dispatches to, e.g. `cash/send`.
pub trait Tx {
    fn path(&self) -> &str;
}

/// A key/value annotation attached to a delivered transaction, used by
/// indexers to find transactions that touched a key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Tag {
    pub fn new(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Outcome of a successful pre-commit check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckResult {
    pub data: Vec<u8>,
    pub log: String,
    /// Gas the transaction may consume when delivered.
    pub gas_allocated: i64,
    /// Fee-derived priority for the transaction pool.
    pub gas_payment: i64,
    /// Smallest fee the handler accepts for this transaction. Zero if the
    /// handler does not price it.
    pub required_fee: Coin,
}

/// Outcome of a successful delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverResult {
    pub data: Vec<u8>,
    pub log: String,
    pub gas_used: i64,
    pub tags: Vec<Tag>,
    pub required_fee: Coin,
}

/// Terminal processing of a transaction.
pub trait Handler<T> {
    fn check(&self, ctx: &Context, store: &mut dyn KvStore, tx: &T) -> Result<CheckResult>;

    fn deliver(&self, ctx: &Context, store: &mut dyn KvStore, tx: &T) -> Result<DeliverResult>;
}

/// A pipeline stage. It either returns an error or calls `next`, possibly
/// with a derived context or a wrapped store, and may adjust the result
/// on the way out.
pub trait Decorator<T> {
    /// Short name used in logs and when listing the stage order.
    fn name(&self) -> &'static str;

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult>;

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult>;
}
