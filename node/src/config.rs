//! Node configuration file.
//!
//! `<home>/config.json` holds the chain id, the fee settings and the
//! genesis balances. Addresses accept Bech32 or hex; coins are written as
//! `"<amount> <TICKER>"`, e.g. `"12.5 IOV"`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use loom_modules::cash::FeeConfig;
use loom_protocol::auth::{Address, AddressError};
use loom_protocol::coin::{Coin, CoinError};

pub const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{field}: {source}")]
    Address {
        field: String,
        #[source]
        source: AddressError,
    },

    #[error("{field}: {source}")]
    Coin {
        field: String,
        #[source]
        source: CoinError,
    },
}

/// One funded account at genesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub address: String,
    pub coins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub chain_id: String,
    pub debug: bool,
    /// Receives every collected fee. Empty means the zero address.
    pub fee_collector: String,
    /// Empty means no minimum.
    pub minimal_fee: String,
    pub genesis: Vec<GenesisAccount>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            chain_id: "loom-devnet".to_string(),
            debug: false,
            fee_collector: String::new(),
            minimal_fee: String::new(),
            genesis: Vec::new(),
        }
    }
}

impl NodeConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: NodeConfig = serde_json::from_str(&raw)?;
        // surface bad values at load time, not at the first block
        config.fee_config()?;
        config.genesis_balances()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw).map_err(io_err)
    }

    pub fn fee_config(&self) -> Result<FeeConfig, ConfigError> {
        let collector = if self.fee_collector.is_empty() {
            Address::default()
        } else {
            parse_address("fee_collector", &self.fee_collector)?
        };
        let minimal_fee = if self.minimal_fee.is_empty() {
            Coin::default()
        } else {
            parse_coin("minimal_fee", &self.minimal_fee)?
        };
        Ok(FeeConfig {
            collector,
            minimal_fee,
        })
    }

    /// Every genesis coin, in file order.
    pub fn genesis_balances(&self) -> Result<Vec<(Address, Coin)>, ConfigError> {
        let mut out = Vec::new();
        for (i, account) in self.genesis.iter().enumerate() {
            let address = parse_address(&format!("genesis[{}].address", i), &account.address)?;
            for (j, coin) in account.coins.iter().enumerate() {
                out.push((address, parse_coin(&format!("genesis[{}].coins[{}]", i, j), coin)?));
            }
        }
        Ok(out)
    }
}

fn parse_address(field: &str, value: &str) -> Result<Address, ConfigError> {
    value.parse().map_err(|source| ConfigError::Address {
        field: field.to_string(),
        source,
    })
}

fn parse_coin(field: &str, value: &str) -> Result<Coin, ConfigError> {
    value.parse().map_err(|source| ConfigError::Coin {
        field: field.to_string(),
        source,
    })
}
