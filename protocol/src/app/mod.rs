//! # Transaction Pipeline
//!
//! A transaction goes through an ordered chain of [`Decorator`]s and ends
//! in a [`Handler`], normally a [`Router`] that dispatches on the
//! transaction's path. Each decorator either fails or calls the rest of the
//! chain, so the first error short-circuits every later stage.
//!
//! ## Architecture
//!
//! ```text
//!   raw bytes ──► BaseApp ──decode──► Stack
//!                   │                   │
//!                   │        ┌──────────┴──────────┐
//!                   │        │ decorator 1         │
//!                   │        │   decorator 2       │
//!                   │        │     ...             │
//!                   │        │       Router ──► Handler for tx.path()
//!                   │        └──────────┬──────────┘
//!                   │                   │
//!                   ◄── Result<CheckResult | DeliverResult, Error>
//!                   │
//!             abci responses {code, data, log, ...}
//! ```
//!
//! The chain is built once at startup with [`Decorators`] and is immutable
//! afterwards, so the stage order can be listed and asserted in tests.

pub mod abci;
pub mod base;
pub mod handler;
pub mod router;
pub mod stack;

pub use abci::{check_tx_error, deliver_tx_error, ResponseCheckTx, ResponseDeliverTx};
pub use base::{AppOptions, BaseApp, BlockHeader, TxDecoder};
pub use handler::{CheckResult, Decorator, DeliverResult, Handler, Tag, Tx};
pub use router::Router;
pub use stack::{Decorators, Stack};
