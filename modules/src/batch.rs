//! Batched messages.
//!
//! A batch carries up to [`MAX_BATCH_MESSAGES`] messages under a single
//! set of signatures and a single fee. Each message runs through the rest
//! of the pipeline as its own sub-transaction, with the parent's proven
//! conditions. Either all of them succeed or none of their writes are
//! kept. Gas and required fees of the messages are summed.

use tracing::debug;

use loom_protocol::app::{CheckResult, Decorator, DeliverResult, Handler, Tx};
use loom_protocol::config::MAX_BATCH_MESSAGES;
use loom_protocol::context::Context;
use loom_protocol::errors::{Error, Result, ResultExt};
use loom_protocol::store::{CacheWrap, KvStore};

pub const BATCH_PATH: &str = "batch";

/// A transaction that may expand into several sub-transactions.
pub trait BatchTx: Tx + Sized {
    /// The sub-transactions of a batch, or `None` for a plain transaction.
    fn batch(&self) -> Result<Option<Vec<Self>>>;
}

/// Rejects empty and oversized batches.
pub fn check_batch_size(len: usize) -> Result<()> {
    if len == 0 {
        return Err(Error::invalid_msg("empty batch"));
    }
    if len > MAX_BATCH_MESSAGES {
        return Err(Error::invalid_msg(format!(
            "batch of {} messages, at most {} allowed",
            len, MAX_BATCH_MESSAGES
        )));
    }
    Ok(())
}

/// Data of a batch result: one entry per sub-message, in order.
pub fn encode_batch_data(data: &[Vec<u8>]) -> Result<Vec<u8>> {
    Ok(bincode::serialize(data)?)
}

pub fn decode_batch_data(raw: &[u8]) -> Result<Vec<Vec<u8>>> {
    Ok(bincode::deserialize(raw)?)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchDecorator;

impl BatchDecorator {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Default)]
struct Collected {
    data: Vec<Vec<u8>>,
    logs: Vec<String>,
}

impl Collected {
    fn push(&mut self, data: Vec<u8>, log: String) {
        self.data.push(data);
        if !log.is_empty() {
            self.logs.push(log);
        }
    }

    fn finish(self) -> Result<(Vec<u8>, String)> {
        Ok((encode_batch_data(&self.data)?, self.logs.join("\n")))
    }
}

impl<T: BatchTx> Decorator<T> for BatchDecorator {
    fn name(&self) -> &'static str {
        "batch"
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        let Some(subs) = tx.batch()? else {
            return next.check(ctx, store, tx);
        };
        check_batch_size(subs.len())?;

        let mut wrap = CacheWrap::new(store);
        let mut out = Collected::default();
        let mut res = CheckResult::default();
        for (i, sub) in subs.iter().enumerate() {
            let sub_res = next
                .check(ctx, &mut wrap, sub)
                .wrap_with(|| format!("batch message {}", i))?;
            res.gas_allocated = res.gas_allocated.saturating_add(sub_res.gas_allocated);
            res.gas_payment = res.gas_payment.saturating_add(sub_res.gas_payment);
            res.required_fee = res.required_fee.add(&sub_res.required_fee)?;
            out.push(sub_res.data, sub_res.log);
        }
        wrap.commit()?;
        (res.data, res.log) = out.finish()?;
        debug!(messages = subs.len(), "batch checked");
        Ok(res)
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        let Some(subs) = tx.batch()? else {
            return next.deliver(ctx, store, tx);
        };
        check_batch_size(subs.len())?;

        let mut wrap = CacheWrap::new(store);
        let mut out = Collected::default();
        let mut res = DeliverResult::default();
        for (i, sub) in subs.iter().enumerate() {
            let sub_res = next
                .deliver(ctx, &mut wrap, sub)
                .wrap_with(|| format!("batch message {}", i))?;
            res.gas_used = res.gas_used.saturating_add(sub_res.gas_used);
            res.tags.extend(sub_res.tags);
            res.required_fee = res.required_fee.add(&sub_res.required_fee)?;
            out.push(sub_res.data, sub_res.log);
        }
        wrap.commit()?;
        (res.data, res.log) = out.finish()?;
        debug!(messages = subs.len(), "batch delivered");
        Ok(res)
    }
}
