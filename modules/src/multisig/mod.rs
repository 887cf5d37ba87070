//! # Multisig Contracts
//!
//! A contract names a set of participant addresses and two thresholds:
//!
//! - `activation_threshold` participants must have signed for the
//!   contract to act at all;
//! - `admin_threshold` participants must have signed to change the
//!   contract itself.
//!
//! ## Architecture
//!
//! ```text
//!   tx.multisig_ids() ──► MultisigDecorator ──► for each id, in order:
//!                                                 load Contract
//!                                                 count participants proven
//!                                                 >= activation? usage condition
//!                                                 >= admin?      admin condition
//!                                               ──► next stage
//! ```
//!
//! A satisfied contract contributes `multisig/usage/<id>`, which behaves
//! exactly like a signature from the contract's address. Contracts may be
//! participants of other contracts: conditions proven by earlier ids in
//! the same transaction count towards later ones.
//!
//! Contracts are stored under a content-derived id, the BLAKE3 digest of
//! their initial encoding. The id stays fixed when an admin update
//! replaces the body.

pub mod decorator;
pub mod handlers;

pub use decorator::MultisigDecorator;
pub use handlers::{CreateContractHandler, UpdateContractHandler};

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use loom_protocol::app::Tx;
use loom_protocol::auth::{Address, Condition, ContextAuth};
use loom_protocol::config::{MAX_MULTISIG_PARTICIPANTS, MAX_MULTISIG_REFS};
use loom_protocol::crypto::blake3_hash;
use loom_protocol::errors::{Error, ErrorKind, Result};
use loom_protocol::store::Bucket;

pub const NAMESPACE: &str = "multisig";

/// Contracts by id.
pub const CONTRACTS: Bucket<Contract> = Bucket::new("contracts");

/// Length of a contract id.
pub const CONTRACT_ID_LENGTH: usize = 32;

/// A transaction that can act on behalf of multisig contracts.
pub trait MultiSigTx: Tx {
    /// Contract ids to evaluate, in order. Empty if none.
    fn multisig_ids(&self) -> &[Vec<u8>];
}

/// A stored multisig contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    pub participants: Vec<Address>,
    pub activation_threshold: u32,
    pub admin_threshold: u32,
}

impl Contract {
    pub fn new(
        participants: Vec<Address>,
        activation_threshold: u32,
        admin_threshold: u32,
    ) -> Self {
        Self {
            participants,
            activation_threshold,
            admin_threshold,
        }
    }

    /// Checks `0 < activation <= admin <= len(participants)` and that no
    /// participant is listed twice.
    pub fn validate(&self) -> Result<()> {
        let count = self.participants.len();
        if count == 0 {
            return Err(Error::invalid_msg("no participants"));
        }
        if count > MAX_MULTISIG_PARTICIPANTS {
            return Err(Error::invalid_msg(format!(
                "{} participants, at most {} allowed",
                count, MAX_MULTISIG_PARTICIPANTS
            )));
        }
        let unique: BTreeSet<&Address> = self.participants.iter().collect();
        if unique.len() != count {
            return Err(Error::invalid_msg("duplicate participant"));
        }
        let (activation, admin) = (self.activation_threshold, self.admin_threshold);
        if activation == 0 || activation > admin || admin as usize > count {
            return Err(Error::invalid_msg(format!(
                "thresholds must satisfy 0 < {} <= {} <= {}",
                activation, admin, count
            )));
        }
        Ok(())
    }

    /// Content-derived id of this contract body.
    pub fn content_id(&self) -> Result<Vec<u8>> {
        Ok(blake3_hash(&bincode::serialize(self)?).to_vec())
    }
}

/// Proven when enough participants signed to use contract `id`.
pub fn usage_condition(id: &[u8]) -> Condition {
    Condition::new(NAMESPACE, "usage", id)
}

/// Proven when enough participants signed to administer contract `id`.
pub fn admin_condition(id: &[u8]) -> Condition {
    Condition::new(NAMESPACE, "admin", id)
}

/// The account address controlled by contract `id`.
pub fn contract_address(id: &[u8]) -> Address {
    usage_condition(id).address()
}

pub const fn authenticator() -> ContextAuth {
    ContextAuth::new(NAMESPACE)
}

#[track_caller]
pub fn contract_not_found(id: &[u8]) -> Error {
    Error::new(ErrorKind::ContractNotFound, hex::encode(id))
}

#[track_caller]
pub fn unauthorized_multisig(id: &[u8]) -> Error {
    Error::new(ErrorKind::UnauthorizedMultisig, hex::encode(id))
}

/// Rejects transactions naming more contracts than allowed.
pub fn validate_ids(ids: &[Vec<u8>]) -> Result<()> {
    if ids.len() > MAX_MULTISIG_REFS {
        return Err(Error::invalid_msg(format!(
            "{} multisig ids, at most {} allowed",
            ids.len(),
            MAX_MULTISIG_REFS
        )));
    }
    Ok(())
}
