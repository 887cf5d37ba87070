// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # LOOM Protocol — Core Library
//!
//! The deterministic transaction-processing core of LOOM. A consensus
//! engine hands it one transaction at a time and gets back a verdict for
//! the pool (check) or a state transition (deliver).
//!
//! ## Architecture
//!
//! The modules follow the dependency order of the engine, leaves first:
//!
//! - **coin** — Fixed-point multi-currency arithmetic. Never floats.
//! - **crypto** — Ed25519 keys, BLAKE3 and SHA-256 digests.
//! - **auth** — Conditions, addresses and authenticators.
//! - **context** — Per-call block data and authenticated conditions.
//! - **store** — Key/value stores, savepoints and typed buckets.
//! - **app** — Decorators, the stage stack, the router and the boundary app.
//! - **errors** — The pipeline error with stable wire codes.
//! - **config** — Protocol constants.
//!
//! The concrete extensions (signatures, multisig, fees, cash, ...) live in
//! the `loom-modules` crate and plug into [`app::Decorators`].
//!
//! ## Design Philosophy
//!
//! 1. Same input, same bytes in the store. On every replica.
//! 2. Overflow is an error, never a wraparound.
//! 3. If it touches money, it has tests. Plural.

pub mod app;
pub mod auth;
pub mod coin;
pub mod config;
pub mod context;
pub mod crypto;
pub mod errors;
pub mod store;

pub use errors::{Error, ErrorKind, Result};
