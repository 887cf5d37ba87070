// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # LOOM Node
//!
//! Entry point for the `loom-node` binary. Parses CLI arguments,
//! initializes logging and dispatches to a subcommand:
//!
//! - `init`    create a home directory and default config
//! - `keygen`  generate a signing key
//! - `replay`  apply a blocks file to the node state
//! - `version` print build version information

mod cli;
mod config;
mod logging;
mod replay;

use std::fs;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::json;

use loom_modules::sigs;
use loom_protocol::crypto::Keypair;
use loom_protocol::store::{MemStore, SledStore};

use cli::{Commands, LoomNodeCli};
use config::NodeConfig;

/// Store directory under the node home.
const DATA_DIR: &str = "data";

fn main() -> Result<()> {
    let cli = LoomNodeCli::parse();
    logging::init_logging(&cli.log.log_level, cli.log.log_format);

    match cli.command {
        Commands::Init(args) => init_home(args),
        Commands::Keygen(args) => keygen(args),
        Commands::Replay(args) => run_replay(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

fn init_home(args: cli::InitArgs) -> Result<()> {
    let path = args.home.join(config::CONFIG_FILE);
    if path.exists() && !args.force {
        bail!("{} already exists, use --force to overwrite", path.display());
    }
    let config = NodeConfig {
        chain_id: args.chain_id,
        ..NodeConfig::default()
    };
    config.save(&path)?;
    fs::create_dir_all(args.home.join(DATA_DIR))
        .with_context(|| format!("failed to create {}", args.home.join(DATA_DIR).display()))?;

    tracing::info!(home = %args.home.display(), chain_id = %config.chain_id, "home initialized");
    println!("Config written to {}", path.display());
    Ok(())
}

fn keygen(args: cli::KeygenArgs) -> Result<()> {
    let keypair = Keypair::generate();
    let public_key = keypair.public_key();
    let secret = hex::encode(keypair.secret_key_bytes());

    let mut out = json!({
        "public_key": public_key.to_hex(),
        "address": sigs::address(&public_key).to_string(),
    });
    match &args.out {
        Some(path) => {
            fs::write(path, &secret)
                .with_context(|| format!("failed to write key to {}", path.display()))?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
            }
            out["key_file"] = json!(path.display().to_string());
        }
        None => out["secret_key"] = json!(secret),
    }
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn run_replay(args: cli::ReplayArgs) -> Result<()> {
    let config_path = args.config_path();
    let mut config = NodeConfig::load(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    if let Some(chain_id) = &args.chain_id {
        config.chain_id = chain_id.clone();
    }
    config.debug |= args.debug;

    let raw = fs::read_to_string(&args.blocks)
        .with_context(|| format!("failed to read {}", args.blocks.display()))?;
    let blocks = replay::parse_blocks(&raw)?;
    tracing::info!(
        blocks = blocks.len(),
        chain_id = %config.chain_id,
        in_memory = args.in_memory,
        "replay starting"
    );

    let summaries = if args.in_memory {
        replay::replay(MemStore::new(), &config, &blocks)?
    } else {
        let data = args.home.join(DATA_DIR);
        let store = SledStore::open(&data)
            .with_context(|| format!("failed to open store at {}", data.display()))?;
        replay::replay(store, &config, &blocks)?
    };

    let failed: usize = summaries
        .iter()
        .map(|b| b.txs.iter().filter(|t| t.code != 0).count())
        .sum();
    tracing::info!(applied = summaries.len(), failed_txs = failed, "replay finished");
    println!("{}", serde_json::to_string_pretty(&summaries)?);
    Ok(())
}

fn print_version() {
    println!("loom-node {}", env!("CARGO_PKG_VERSION"));
    println!("rustc     {}", option_env!("RUSTC_VERSION").unwrap_or("unknown"));
}
