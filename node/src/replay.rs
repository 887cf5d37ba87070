//! Block replay.
//!
//! A blocks file is a JSON array of `{height, time, txs}` where each
//! transaction is hex-encoded. Replay resumes from the store's last
//! commit: blocks at or below it are skipped, the rest must follow on
//! without gaps. A fresh store is seeded with the genesis balances,
//! committed as height 1.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use loom_modules::cash::Controller;
use loom_modules::stack::application;
use loom_protocol::app::{AppOptions, BlockHeader, ResponseDeliverTx};
use loom_protocol::store::CommitStore;

use crate::config::NodeConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayBlock {
    pub height: u64,
    pub time: DateTime<Utc>,
    #[serde(default)]
    pub txs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxSummary {
    pub code: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub log: String,
    pub gas_used: i64,
    pub tags: usize,
}

impl From<&ResponseDeliverTx> for TxSummary {
    fn from(res: &ResponseDeliverTx) -> Self {
        Self {
            code: res.code,
            log: res.log.clone(),
            gas_used: res.gas_used,
            tags: res.tags.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockSummary {
    pub height: u64,
    pub app_hash: String,
    pub txs: Vec<TxSummary>,
}

pub fn parse_blocks(raw: &str) -> Result<Vec<ReplayBlock>> {
    serde_json::from_str(raw).context("malformed blocks file")
}

/// Seeds a fresh store with the configured balances. Returns `false` if
/// the store already holds committed state.
pub fn apply_genesis<S: CommitStore>(store: &mut S, config: &NodeConfig) -> Result<bool> {
    if store.last_commit().version > 0 {
        return Ok(false);
    }
    let ctrl = Controller::new();
    for (address, coin) in config.genesis_balances()? {
        ctrl.issue_coins(store, &address, &coin)
            .with_context(|| format!("genesis balance for {}", address))?;
    }
    let info = store.commit().context("genesis commit")?;
    info!(accounts = config.genesis.len(), hash = %hex::encode(info.hash), "genesis applied");
    Ok(true)
}

/// Applies `blocks` on top of `store` and returns one summary per block
/// applied.
pub fn replay<S: CommitStore>(
    mut store: S,
    config: &NodeConfig,
    blocks: &[ReplayBlock],
) -> Result<Vec<BlockSummary>> {
    apply_genesis(&mut store, config)?;

    let options = AppOptions {
        chain_id: config.chain_id.clone(),
        debug: config.debug,
    };
    let mut app = application(store, options, config.fee_config()?)?;

    let mut summaries = Vec::new();
    for block in blocks {
        if block.height <= app.last_height() {
            debug!(height = block.height, "block already applied");
            continue;
        }
        if block.height != app.last_height() + 1 {
            bail!(
                "expected block {}, found {}",
                app.last_height() + 1,
                block.height
            );
        }

        app.begin_block(BlockHeader {
            chain_id: config.chain_id.clone(),
            height: block.height,
            time: block.time,
        })?;

        let mut txs = Vec::with_capacity(block.txs.len());
        for (i, encoded) in block.txs.iter().enumerate() {
            let raw = hex::decode(encoded.trim())
                .with_context(|| format!("block {} tx {}: invalid hex", block.height, i))?;
            txs.push(TxSummary::from(&app.deliver_tx(&raw)));
        }

        let info = app.commit()?;
        summaries.push(BlockSummary {
            height: block.height,
            app_hash: hex::encode(info.hash),
            txs,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use loom_modules::cash::SendMsg;
    use loom_modules::sigs;
    use loom_modules::tx::{Msg, StdTx};
    use loom_protocol::auth::Address;
    use loom_protocol::coin::Coin;
    use loom_protocol::crypto::Keypair;
    use loom_protocol::errors::ErrorKind;
    use loom_protocol::store::{MemStore, SledStore};

    use crate::config::GenesisAccount;

    const CHAIN_ID: &str = "loom-test";

    fn config(alice: &Keypair) -> NodeConfig {
        NodeConfig {
            chain_id: CHAIN_ID.to_string(),
            genesis: vec![GenesisAccount {
                address: sigs::address(&alice.public_key()).to_string(),
                coins: vec!["10 IOV".to_string()],
            }],
            ..NodeConfig::default()
        }
    }

    fn send_tx(from: &Keypair, sequence: i64, whole: i64) -> String {
        let msg = SendMsg::new(
            sigs::address(&from.public_key()),
            Address::from_bytes([9; 20]),
            Coin::new(whole, 0, "IOV"),
        );
        let mut tx = StdTx::new(Msg::Send(msg));
        tx.sign(from, CHAIN_ID, sequence).unwrap();
        hex::encode(tx.encode().unwrap())
    }

    fn block(height: u64, txs: Vec<String>) -> ReplayBlock {
        ReplayBlock {
            height,
            time: Utc.timestamp_opt(1_700_000_000 + height as i64, 0).unwrap(),
            txs,
        }
    }

    #[test]
    fn replays_blocks_in_memory() {
        let alice = Keypair::from_seed(&[1; 32]);
        let blocks = vec![
            block(2, vec![send_tx(&alice, 0, 3)]),
            block(3, vec![send_tx(&alice, 1, 100), "00".to_string()]),
        ];
        let out = replay(MemStore::new(), &config(&alice), &blocks).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].txs[0].code, 0);
        assert_eq!(out[0].txs[0].tags, 3);
        assert_eq!(out[1].txs[0].code, ErrorKind::InsufficientAmount.code());
        assert_eq!(out[1].txs[1].code, ErrorKind::InvalidMsg.code());
        assert_ne!(out[0].app_hash, out[1].app_hash);
    }

    #[test]
    fn gaps_and_bad_hex_are_fatal() {
        let alice = Keypair::from_seed(&[1; 32]);
        let err = replay(MemStore::new(), &config(&alice), &[block(5, vec![])]).unwrap_err();
        assert!(err.to_string().contains("expected block 2"), "{}", err);

        let err = replay(MemStore::new(), &config(&alice), &[block(2, vec!["xyz".into()])])
            .unwrap_err();
        assert!(err.to_string().contains("invalid hex"), "{}", err);
    }

    #[test]
    fn resumes_from_persisted_store() {
        let dir = tempfile::tempdir().unwrap();
        let alice = Keypair::from_seed(&[1; 32]);
        let cfg = config(&alice);
        let blocks = vec![
            block(2, vec![send_tx(&alice, 0, 1)]),
            block(3, vec![send_tx(&alice, 1, 1)]),
        ];

        let first = replay(SledStore::open(dir.path()).unwrap(), &cfg, &blocks[..1]).unwrap();
        assert_eq!(first.len(), 1);

        // genesis is not applied twice and block 2 is skipped
        let second = replay(SledStore::open(dir.path()).unwrap(), &cfg, &blocks).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].height, 3);
        assert_eq!(second[0].txs[0].code, 0);

        let store = SledStore::open(dir.path()).unwrap();
        let balance = Controller::new()
            .balance(&store, &sigs::address(&alice.public_key()))
            .unwrap();
        assert_eq!(balance.get("IOV"), Some(&Coin::new(8, 0, "IOV")));
    }

    #[test]
    fn blocks_file_format() {
        let raw = r#"[{"height": 2, "time": "2026-01-01T00:00:00Z", "txs": ["00ff"]},
                      {"height": 3, "time": "2026-01-01T00:00:05Z"}]"#;
        let blocks = parse_blocks(raw).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].txs.is_empty());
        assert!(parse_blocks("{}").is_err());
    }
}
