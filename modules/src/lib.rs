//! # LOOM Modules
//!
//! The extensions that make up a working LOOM chain. Each one contributes
//! pipeline stages, message handlers, or both:
//!
//! - **sigs** — Ed25519 signatures with a per-signer replay counter.
//! - **multisig** — Contracts with separate activation and admin
//!   thresholds, evaluated against the conditions proven so far.
//! - **hashlock** — Conditions proven by disclosing a SHA-256 preimage.
//! - **cash** — Wallets, the funds-transfer controller, fee enforcement
//!   and the send message.
//! - **batch** — Several messages executed atomically under one set of
//!   signatures.
//! - **utils** — Logging, panic recovery, key tagging and savepoints.
//!
//! [`tx::StdTx`] is the transaction type that carries all of the above,
//! and [`stack`] wires everything into the standard stage order.
//!
//! ## Design Principles
//!
//! 1. A stage only sees a transaction through the capability trait it
//!    needs (`SignedTx`, `FeeTx`, ...), never through the concrete type.
//! 2. Conditions flow forward through the context. A stage can only rely
//!    on conditions proven by stages before it.
//! 3. Money moves through the [`cash::CoinMover`] capability only.

pub mod batch;
pub mod cash;
pub mod hashlock;
pub mod multisig;
pub mod sigs;
pub mod stack;
pub mod tx;
pub mod utils;
