//! Per-transaction logging.

use std::time::Instant;

use tracing::{info, warn};

use loom_protocol::app::{CheckResult, Decorator, DeliverResult, Handler, Tx};
use loom_protocol::context::Context;
use loom_protocol::errors::Result;
use loom_protocol::store::KvStore;

/// Emits one event per call, at `info` on success and `warn` on failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct Logging;

impl Logging {
    pub fn new() -> Self {
        Self
    }
}

fn log_outcome<R>(phase: &str, ctx: &Context, path: &str, started: Instant, res: &Result<R>) {
    let elapsed_us = started.elapsed().as_micros() as u64;
    match res {
        Ok(_) => info!(phase, path, height = ctx.height(), elapsed_us, "tx ok"),
        Err(err) => warn!(
            phase,
            path,
            height = ctx.height(),
            elapsed_us,
            code = err.code(),
            error = %err,
            "tx failed"
        ),
    }
}

impl<T: Tx> Decorator<T> for Logging {
    fn name(&self) -> &'static str {
        "logging"
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        let started = Instant::now();
        let res = next.check(ctx, store, tx);
        log_outcome("check", ctx, tx.path(), started, &res);
        res
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        let started = Instant::now();
        let res = next.deliver(ctx, store, tx);
        log_outcome("deliver", ctx, tx.path(), started, &res);
        res
    }
}
