//! Contract creation and admin updates.

use serde::{Deserialize, Serialize};
use tracing::info;

use loom_protocol::app::{CheckResult, DeliverResult, Handler};
use loom_protocol::auth::{Address, Authenticator};
use loom_protocol::context::Context;
use loom_protocol::errors::{Error, ErrorKind, Result};
use loom_protocol::store::KvStore;

use super::{admin_condition, contract_not_found, Contract, CONTRACTS};
use crate::tx::{Msg, StdTx};

pub const CREATE_PATH: &str = "multisig/create";
pub const UPDATE_PATH: &str = "multisig/update";

/// Registers a new contract. Result data is the contract id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateContractMsg {
    pub participants: Vec<Address>,
    pub activation_threshold: u32,
    pub admin_threshold: u32,
}

/// Replaces the body of an existing contract. Requires the contract's
/// admin condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateContractMsg {
    pub id: Vec<u8>,
    pub participants: Vec<Address>,
    pub activation_threshold: u32,
    pub admin_threshold: u32,
}

impl CreateContractMsg {
    pub fn contract(&self) -> Contract {
        Contract::new(
            self.participants.clone(),
            self.activation_threshold,
            self.admin_threshold,
        )
    }
}

impl UpdateContractMsg {
    pub fn contract(&self) -> Contract {
        Contract::new(
            self.participants.clone(),
            self.activation_threshold,
            self.admin_threshold,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CreateContractHandler;

impl CreateContractHandler {
    fn validate(tx: &StdTx) -> Result<Contract> {
        let Msg::CreateContract(msg) = &tx.msg else {
            return Err(Error::invalid_msg(format!(
                "expected {}, got {}",
                CREATE_PATH,
                tx.msg.path()
            )));
        };
        let contract = msg.contract();
        contract.validate()?;
        Ok(contract)
    }
}

impl Handler<StdTx> for CreateContractHandler {
    fn check(&self, _: &Context, _: &mut dyn KvStore, tx: &StdTx) -> Result<CheckResult> {
        Self::validate(tx)?;
        Ok(CheckResult::default())
    }

    fn deliver(&self, _: &Context, store: &mut dyn KvStore, tx: &StdTx) -> Result<DeliverResult> {
        let contract = Self::validate(tx)?;
        let id = contract.content_id()?;
        if CONTRACTS.get(store, &id)?.is_some() {
            return Err(Error::new(
                ErrorKind::Duplicate,
                format!("contract {}", hex::encode(&id)),
            ));
        }
        CONTRACTS.save(store, &id, &contract)?;
        info!(
            contract = %hex::encode(&id),
            participants = contract.participants.len(),
            "contract created"
        );
        Ok(DeliverResult {
            data: id,
            ..Default::default()
        })
    }
}

pub struct UpdateContractHandler<A> {
    auth: A,
}

impl<A: Authenticator> UpdateContractHandler<A> {
    pub fn new(auth: A) -> Self {
        Self { auth }
    }

    fn validate<'a>(
        &self,
        ctx: &Context,
        store: &dyn KvStore,
        tx: &'a StdTx,
    ) -> Result<(&'a [u8], Contract)> {
        let Msg::UpdateContract(msg) = &tx.msg else {
            return Err(Error::invalid_msg(format!(
                "expected {}, got {}",
                UPDATE_PATH,
                tx.msg.path()
            )));
        };
        let contract = msg.contract();
        contract.validate()?;
        if CONTRACTS.get(store, &msg.id)?.is_none() {
            return Err(contract_not_found(&msg.id));
        }
        if !self.auth.has_condition(ctx, &admin_condition(&msg.id)) {
            return Err(Error::unauthorized(format!(
                "admin of contract {} required",
                hex::encode(&msg.id)
            )));
        }
        Ok((&msg.id, contract))
    }
}

impl<A: Authenticator> Handler<StdTx> for UpdateContractHandler<A> {
    fn check(&self, ctx: &Context, store: &mut dyn KvStore, tx: &StdTx) -> Result<CheckResult> {
        self.validate(ctx, store, tx)?;
        Ok(CheckResult::default())
    }

    fn deliver(&self, ctx: &Context, store: &mut dyn KvStore, tx: &StdTx) -> Result<DeliverResult> {
        let (id, contract) = self.validate(ctx, store, tx)?;
        CONTRACTS.save(store, id, &contract)?;
        info!(contract = %hex::encode(id), "contract updated");
        Ok(DeliverResult::default())
    }
}
