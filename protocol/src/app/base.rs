//! The boundary application.
//!
//! [`BaseApp`] is what the consensus engine talks to. It owns the
//! committed store and two write buffers over it:
//!
//! ```text
//!   check_tx ──► check buffer ──┐
//!                               ├──► committed store (CommitStore)
//!   deliver_tx ─► deliver buffer┘         ▲
//!                     │                   │
//!                     └──── commit ───────┘  (check buffer reset)
//! ```
//!
//! Check calls see the state as of the last commit plus earlier checks in
//! the same block. Deliver calls see the state as of the last commit plus
//! earlier deliveries. Only [`BaseApp::commit`] touches the committed
//! store.

use std::mem;
use std::panic::{self, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::abci::{check_tx_error, deliver_tx_error, ResponseCheckTx, ResponseDeliverTx};
use super::handler::{CheckResult, DeliverResult, Handler};
use crate::config::{is_valid_chain_id, MAX_TX_SIZE_BYTES};
use crate::context::Context;
use crate::errors::{Error, ErrorKind, Result};
use crate::store::{CacheWrap, CommitInfo, CommitStore, KvPair, KvStore, WriteBuffer};

/// Block-level facts handed over by the consensus engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: u64,
    pub time: DateTime<Utc>,
}

/// Runtime options of a [`BaseApp`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppOptions {
    pub chain_id: String,
    /// Render full error detail, call sites included, in responses.
    pub debug: bool,
}

/// Turns raw transaction bytes into a typed transaction.
pub trait TxDecoder<T> {
    fn decode(&self, raw: &[u8]) -> Result<T>;
}

impl<T, F> TxDecoder<T> for F
where
    F: Fn(&[u8]) -> Result<T>,
{
    fn decode(&self, raw: &[u8]) -> Result<T> {
        self(raw)
    }
}

pub struct BaseApp<T, S: CommitStore> {
    store: S,
    decoder: Box<dyn TxDecoder<T>>,
    handler: Box<dyn Handler<T>>,
    options: AppOptions,
    check_state: WriteBuffer,
    deliver_state: WriteBuffer,
    block: Option<BlockHeader>,
    last_height: u64,
    last_time: DateTime<Utc>,
}

impl<T, S: CommitStore> BaseApp<T, S> {
    /// Builds an app over `store`. The height resumes from the store's
    /// last commit.
    pub fn new(
        store: S,
        options: AppOptions,
        decoder: impl TxDecoder<T> + 'static,
        handler: impl Handler<T> + 'static,
    ) -> Result<Self> {
        if !is_valid_chain_id(&options.chain_id) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("invalid chain id {:?}", options.chain_id),
            ));
        }
        let last_height = store.last_commit().version;
        info!(chain_id = %options.chain_id, height = last_height, "app loaded");
        Ok(Self {
            store,
            decoder: Box::new(decoder),
            handler: Box::new(handler),
            options,
            check_state: WriteBuffer::new(),
            deliver_state: WriteBuffer::new(),
            block: None,
            last_height,
            last_time: DateTime::<Utc>::default(),
        })
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    /// Committed store. Pending writes of the current block are not
    /// visible through it.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn last_height(&self) -> u64 {
        self.last_height
    }

    pub fn last_commit(&self) -> CommitInfo {
        self.store.last_commit()
    }

    /// Reads a committed value.
    pub fn query(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.store.get(key)?)
    }

    /// Reads every committed pair under `prefix`.
    pub fn query_prefix(&self, prefix: &[u8]) -> Result<Vec<KvPair>> {
        Ok(self.store.prefix_scan(prefix)?)
    }

    /// Opens a block. Deliveries are only accepted between `begin_block`
    /// and `commit`.
    pub fn begin_block(&mut self, header: BlockHeader) -> Result<()> {
        if header.chain_id != self.options.chain_id {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "block for chain {} on chain {}",
                    header.chain_id, self.options.chain_id
                ),
            ));
        }
        if header.height <= self.last_height {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "block height {} not above committed height {}",
                    header.height, self.last_height
                ),
            ));
        }
        debug!(height = header.height, "begin block");
        self.block = Some(header);
        Ok(())
    }

    pub fn check_tx(&mut self, raw: &[u8]) -> ResponseCheckTx {
        match self.run_check(raw) {
            Ok(res) => res.into(),
            Err(err) => check_tx_error(err, self.options.debug),
        }
    }

    pub fn deliver_tx(&mut self, raw: &[u8]) -> ResponseDeliverTx {
        match self.run_deliver(raw) {
            Ok(res) => res.into(),
            Err(err) => deliver_tx_error(err, self.options.debug),
        }
    }

    /// Persists everything delivered since the last commit and resets the
    /// check state.
    pub fn commit(&mut self) -> Result<CommitInfo> {
        let writes = mem::take(&mut self.deliver_state);
        let pending = writes.len();
        self.store.write_batch(writes)?;
        let commit = self.store.commit()?;
        self.check_state = WriteBuffer::new();
        if let Some(block) = self.block.take() {
            self.last_height = block.height;
            self.last_time = block.time;
        }
        info!(
            height = self.last_height,
            version = commit.version,
            writes = pending,
            hash = %hex::encode(commit.hash),
            "committed"
        );
        Ok(commit)
    }

    fn decode(&self, raw: &[u8]) -> Result<T> {
        if raw.len() > MAX_TX_SIZE_BYTES {
            return Err(Error::invalid_msg(format!(
                "tx of {} bytes exceeds {} bytes",
                raw.len(),
                MAX_TX_SIZE_BYTES
            )));
        }
        self.decoder.decode(raw)
    }

    fn run_check(&mut self, raw: &[u8]) -> Result<CheckResult> {
        let tx = self.decode(raw)?;
        let ctx = Context::new(
            self.options.chain_id.clone(),
            self.last_height + 1,
            self.last_time,
        );
        let handler = self.handler.as_ref();
        let mut state = CacheWrap::resume(&mut self.store, mem::take(&mut self.check_state));
        let outcome = isolated(&mut state, |store| handler.check(&ctx, store, &tx));
        self.check_state = state.into_buffer();
        outcome
    }

    fn run_deliver(&mut self, raw: &[u8]) -> Result<DeliverResult> {
        let block = self
            .block
            .as_ref()
            .ok_or_else(|| Error::internal("deliver outside of a block"))?;
        let ctx = Context::new(block.chain_id.clone(), block.height, block.time);
        let tx = self.decode(raw)?;
        let handler = self.handler.as_ref();
        let mut state = CacheWrap::resume(&mut self.store, mem::take(&mut self.deliver_state));
        let outcome = isolated(&mut state, |store| handler.deliver(&ctx, store, &tx));
        self.deliver_state = state.into_buffer();
        outcome
    }
}

/// Runs `f` over a savepoint of `parent`. The savepoint is kept unless `f`
/// panics; a panic becomes an internal error and leaves no writes behind.
fn isolated<R>(
    parent: &mut dyn KvStore,
    f: impl FnOnce(&mut dyn KvStore) -> Result<R>,
) -> Result<R> {
    let mut call = CacheWrap::new(parent);
    match panic::catch_unwind(AssertUnwindSafe(|| f(&mut call))) {
        Ok(outcome) => {
            call.commit()?;
            outcome
        }
        Err(payload) => {
            call.rollback();
            Err(Error::from_panic(payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    #[test]
    fn isolated_keeps_writes_of_failed_calls() {
        let mut store = MemStore::new();
        let res: Result<()> = isolated(&mut store, |s| {
            s.set(b"k".to_vec(), b"v".to_vec())?;
            Err(Error::unauthorized("no"))
        });
        assert_eq!(res.unwrap_err().kind(), ErrorKind::Unauthorized);
        assert_eq!(store.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn isolated_drops_writes_of_panicking_calls() {
        let mut store = MemStore::new();
        let res: Result<()> = isolated(&mut store, |s| {
            s.set(b"k".to_vec(), b"v".to_vec())?;
            panic!("handler bug")
        });
        let err = res.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.message(), "panic: handler bug");
        assert!(store.is_empty());
    }

    #[test]
    fn closures_are_decoders() {
        let decoder = |raw: &[u8]| -> Result<usize> { Ok(raw.len()) };
        assert_eq!(decoder.decode(b"abc").unwrap(), 3);
    }
}
