//! Value transfers between accounts.

use serde::{Deserialize, Serialize};

use loom_protocol::app::{CheckResult, DeliverResult, Handler};
use loom_protocol::auth::{Address, Authenticator};
use loom_protocol::coin::Coin;
use loom_protocol::config::{DEFAULT_GAS_ALLOCATED, MAX_MEMO_LENGTH, MAX_REF_LENGTH};
use loom_protocol::context::Context;
use loom_protocol::errors::{Error, ErrorKind, Result};
use loom_protocol::store::KvStore;

use super::CoinMover;
use crate::tx::{Msg, StdTx};

pub const SEND_PATH: &str = "cash/send";

/// Moves `amount` from `src` to `dest`. `src` must have authorized the
/// transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMsg {
    pub src: Address,
    pub dest: Address,
    pub amount: Coin,
    pub memo: String,
    pub reference: Vec<u8>,
}

impl SendMsg {
    pub fn new(src: Address, dest: Address, amount: Coin) -> Self {
        Self {
            src,
            dest,
            amount,
            memo: String::new(),
            reference: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.amount.validate()?;
        if !self.amount.is_positive() {
            return Err(Error::new(
                ErrorKind::InvalidCoin,
                format!("non-positive amount {}", self.amount),
            ));
        }
        if self.memo.len() > MAX_MEMO_LENGTH {
            return Err(Error::invalid_msg(format!(
                "memo of {} bytes, at most {} allowed",
                self.memo.len(),
                MAX_MEMO_LENGTH
            )));
        }
        if self.reference.len() > MAX_REF_LENGTH {
            return Err(Error::invalid_msg(format!(
                "reference of {} bytes, at most {} allowed",
                self.reference.len(),
                MAX_REF_LENGTH
            )));
        }
        Ok(())
    }
}

pub struct SendHandler<A, C> {
    auth: A,
    mover: C,
}

impl<A: Authenticator, C: CoinMover> SendHandler<A, C> {
    pub fn new(auth: A, mover: C) -> Self {
        Self { auth, mover }
    }

    fn validate<'a>(&self, ctx: &Context, tx: &'a StdTx) -> Result<&'a SendMsg> {
        let Msg::Send(msg) = &tx.msg else {
            return Err(Error::invalid_msg(format!(
                "expected {}, got {}",
                SEND_PATH,
                tx.msg.path()
            )));
        };
        msg.validate()?;
        if !self.auth.has_address(ctx, &msg.src) {
            return Err(Error::unauthorized(format!("{} did not sign", msg.src)));
        }
        Ok(msg)
    }
}

impl<A: Authenticator, C: CoinMover> Handler<StdTx> for SendHandler<A, C> {
    fn check(&self, ctx: &Context, _: &mut dyn KvStore, tx: &StdTx) -> Result<CheckResult> {
        self.validate(ctx, tx)?;
        Ok(CheckResult {
            gas_allocated: DEFAULT_GAS_ALLOCATED,
            ..Default::default()
        })
    }

    fn deliver(&self, ctx: &Context, store: &mut dyn KvStore, tx: &StdTx) -> Result<DeliverResult> {
        let msg = self.validate(ctx, tx)?;
        self.mover.move_coins(store, &msg.src, &msg.dest, &msg.amount)?;
        Ok(DeliverResult::default())
    }
}
