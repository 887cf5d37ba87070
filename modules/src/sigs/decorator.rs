//! Pipeline stage for signature verification.

use tracing::debug;

use loom_protocol::app::{CheckResult, Decorator, DeliverResult, Handler};
use loom_protocol::context::Context;
use loom_protocol::errors::{ResultExt, Result};
use loom_protocol::store::KvStore;

use super::{verify_tx_signatures, SignedTx, NAMESPACE};

/// Verifies signatures, advances sequences and records the proven
/// conditions under the `sigs` namespace for later stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SigsDecorator;

impl SigsDecorator {
    pub fn new() -> Self {
        Self
    }

    fn authenticate<T: SignedTx>(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
    ) -> Result<Context> {
        let conds = verify_tx_signatures(ctx, store, tx).wrap("sigs")?;
        debug!(signers = conds.len(), "signatures verified");
        Ok(ctx.with_conditions(NAMESPACE, conds))
    }
}

impl<T: SignedTx> Decorator<T> for SigsDecorator {
    fn name(&self) -> &'static str {
        "sigs"
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        let ctx = self.authenticate(ctx, store, tx)?;
        next.check(&ctx, store, tx)
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        let ctx = self.authenticate(ctx, store, tx)?;
        next.deliver(&ctx, store, tx)
    }
}
