//! Savepoints between pipeline stages.
//!
//! Placed early in the chain, [`Savepoint::on_check`] makes every check
//! free of side effects: whatever the later stages write is discarded,
//! whether they succeed or fail.
//!
//! Placed right before the router, [`Savepoint::on_deliver`] keeps the
//! handler's writes only if the handler succeeds. The stages before it
//! (sequence bumps, fee collection) write to the outer store and stay
//! applied when the handler fails.

use loom_protocol::app::{CheckResult, Decorator, DeliverResult, Handler, Tx};
use loom_protocol::context::Context;
use loom_protocol::errors::Result;
use loom_protocol::store::{CacheWrap, KvStore};

/// Phase whose writes a [`Savepoint`] guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Check,
    Deliver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Savepoint {
    phase: Phase,
}

impl Savepoint {
    /// Discards all writes made below it during check.
    pub fn on_check() -> Self {
        Self {
            phase: Phase::Check,
        }
    }

    /// Discards writes made below it during a failed deliver.
    pub fn on_deliver() -> Self {
        Self {
            phase: Phase::Deliver,
        }
    }
}

impl<T: Tx> Decorator<T> for Savepoint {
    fn name(&self) -> &'static str {
        match self.phase {
            Phase::Check => "savepoint-check",
            Phase::Deliver => "savepoint-deliver",
        }
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        if self.phase != Phase::Check {
            return next.check(ctx, store, tx);
        }
        let mut wrap = CacheWrap::new(store);
        let res = next.check(ctx, &mut wrap, tx);
        wrap.rollback();
        res
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        if self.phase != Phase::Deliver {
            return next.deliver(ctx, store, tx);
        }
        let mut wrap = CacheWrap::new(store);
        let res = next.deliver(ctx, &mut wrap, tx)?;
        wrap.commit()?;
        Ok(res)
    }
}
