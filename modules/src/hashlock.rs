//! Conditions proven by disclosing a secret.
//!
//! A transaction may carry a preimage. The stage hashes it with SHA-256
//! and records `hash/sha256/<digest>` under the `hash` namespace, so
//! anything locked to that digest (an account, a multisig participant)
//! can be used by whoever knows the secret.

use loom_protocol::app::{CheckResult, Decorator, DeliverResult, Handler, Tx};
use loom_protocol::auth::{Condition, ContextAuth};
use loom_protocol::context::Context;
use loom_protocol::crypto::sha256;
use loom_protocol::errors::Result;
use loom_protocol::store::KvStore;

pub const NAMESPACE: &str = "hash";

pub const KIND: &str = "sha256";

/// A transaction that can disclose a preimage.
pub trait HashKeyTx: Tx {
    fn preimage(&self) -> Option<&[u8]>;
}

/// The condition a preimage unlocks.
pub fn preimage_condition(preimage: &[u8]) -> Condition {
    digest_condition(&sha256(preimage))
}

/// The condition locked to a known digest.
pub fn digest_condition(digest: &[u8; 32]) -> Condition {
    Condition::new(NAMESPACE, KIND, digest)
}

pub const fn authenticator() -> ContextAuth {
    ContextAuth::new(NAMESPACE)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HashlockDecorator;

impl HashlockDecorator {
    pub fn new() -> Self {
        Self
    }
}

fn authenticate<T: HashKeyTx>(ctx: &Context, tx: &T) -> Context {
    match tx.preimage() {
        Some(preimage) => ctx.with_conditions(NAMESPACE, vec![preimage_condition(preimage)]),
        None => ctx.clone(),
    }
}

impl<T: HashKeyTx> Decorator<T> for HashlockDecorator {
    fn name(&self) -> &'static str {
        "hashlock"
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        next.check(&authenticate(ctx, tx), store, tx)
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        next.deliver(&authenticate(ctx, tx), store, tx)
    }
}
