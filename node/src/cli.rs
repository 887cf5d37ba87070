//! # CLI Interface
//!
//! Command-line arguments for `loom-node`, defined with `clap` derive.
//! Subcommands: `init`, `keygen`, `replay` and `version`.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::logging::LogFormat;

/// LOOM node.
///
/// Runs the standard transaction pipeline over a persistent store. Blocks
/// are read from a file and replayed in order.
#[derive(Parser, Debug)]
#[command(
    name = "loom-node",
    about = "LOOM transaction-processing node",
    version,
    propagate_version = true
)]
pub struct LoomNodeCli {
    #[command(flatten)]
    pub log: LogArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a home directory with a default config file.
    Init(InitArgs),
    /// Generate an Ed25519 signing key and print its address.
    Keygen(KeygenArgs),
    /// Apply a file of blocks to the node state.
    Replay(ReplayArgs),
    /// Print version information and exit.
    Version,
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Default filter when `RUST_LOG` is not set.
    #[arg(
        long,
        global = true,
        env = "LOOM_LOG",
        default_value = "loom_node=info,loom_protocol=info,loom_modules=info"
    )]
    pub log_level: String,

    #[arg(
        long,
        global = true,
        value_enum,
        env = "LOOM_LOG_FORMAT",
        default_value_t = LogFormat::Pretty
    )]
    pub log_format: LogFormat,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Home directory holding `config.json` and the `data` store.
    #[arg(long, env = "LOOM_HOME", default_value = ".loom")]
    pub home: PathBuf,

    #[arg(long, default_value = "loom-devnet")]
    pub chain_id: String,

    /// Overwrite an existing config file.
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Write the hex secret to this file instead of printing it.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    #[arg(long, env = "LOOM_HOME", default_value = ".loom")]
    pub home: PathBuf,

    /// Config file. Defaults to `<home>/config.json`.
    #[arg(long, short = 'c', env = "LOOM_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON file with the blocks to apply.
    #[arg(long, short = 'b')]
    pub blocks: PathBuf,

    /// Keep state in memory and discard it on exit.
    #[arg(long)]
    pub in_memory: bool,

    /// Overrides `chain_id` from the config file.
    #[arg(long, env = "LOOM_CHAIN_ID")]
    pub chain_id: Option<String>,

    /// Report full error details, including call sites.
    #[arg(long)]
    pub debug: bool,
}

impl ReplayArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.home.join(crate::config::CONFIG_FILE))
    }
}
