//! # Cash
//!
//! Wallet balances and everything that moves them.
//!
//! ## Architecture
//!
//! ```text
//! mod.rs         — FeeInfo, FeeConfig, the FeeTx capability
//! controller.rs  — CoinMover capability and the wallet-backed Controller
//! fee.rs         — FeeDecorator and DynamicFeeDecorator: fee validation,
//!                  collection and priority
//! send.rs        — SendMsg and its handler
//! ```
//!
//! Balances are [`Coins`](loom_protocol::coin::Coins) stored per address
//! in the `cash` bucket. An address without a record has an empty
//! balance, and a balance that drops to zero is deleted.

pub mod controller;
pub mod fee;
pub mod send;

pub use controller::{CoinMover, Controller, WALLETS};
pub use fee::{DynamicFeeDecorator, FeeDecorator};
pub use send::{SendHandler, SendMsg};

use serde::{Deserialize, Serialize};

use loom_protocol::app::Tx;
use loom_protocol::auth::Address;
use loom_protocol::coin::Coin;
use loom_protocol::errors::{Error, ErrorKind, Result};

/// A transaction that can declare a fee.
pub trait FeeTx: Tx {
    fn fee_info(&self) -> Option<&FeeInfo>;
}

/// The fee a transaction offers to pay.
///
/// `payer` may be left out, in which case the main signer pays.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeInfo {
    pub payer: Option<Address>,
    pub fees: Coin,
}

impl FeeInfo {
    pub fn new(fees: Coin) -> Self {
        Self { payer: None, fees }
    }

    pub fn with_payer(mut self, payer: Address) -> Self {
        self.payer = Some(payer);
        self
    }

    /// Fills in `payer` if none was declared.
    pub fn default_payer(mut self, payer: Option<Address>) -> Self {
        if self.payer.is_none() {
            self.payer = payer;
        }
        self
    }

    /// A declared fee must be a valid, non-negative amount.
    pub fn validate(&self) -> Result<()> {
        self.fees.validate()?;
        if !self.fees.is_non_negative() {
            return Err(Error::new(
                ErrorKind::InvalidCoin,
                format!("negative fee {}", self.fees),
            ));
        }
        Ok(())
    }
}

/// Fee policy, fixed when the stack is built.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Receives every collected fee.
    pub collector: Address,
    /// Smallest acceptable fee. Zero disables the minimum; a non-zero
    /// minimum also fixes the fee currency.
    pub minimal_fee: Coin,
}
