//! The standard transaction.
//!
//! [`StdTx`] carries one [`Msg`] plus the optional parts every extension
//! reads through its capability trait:
//!
//! | part         | capability   | stage      |
//! |--------------|--------------|------------|
//! | `signatures` | `SignedTx`   | sigs       |
//! | `multisig`   | `MultiSigTx` | multisig   |
//! | `fees`       | `FeeTx`      | fee        |
//! | `preimage`   | `HashKeyTx`  | hashlock   |
//! | `Msg::Batch` | `BatchTx`    | batch      |
//!
//! On the wire a transaction is its bincode encoding.

use serde::{Deserialize, Serialize};

use loom_protocol::app::Tx;
use loom_protocol::config::MAX_BATCH_MESSAGES;
use loom_protocol::crypto::Keypair;
use loom_protocol::errors::{Error, Result};

use crate::batch::{check_batch_size, BatchTx, BATCH_PATH};
use crate::cash::{FeeInfo, FeeTx, SendMsg};
use crate::hashlock::HashKeyTx;
use crate::multisig::handlers::{
    CreateContractMsg, UpdateContractMsg, CREATE_PATH, UPDATE_PATH,
};
use crate::multisig::MultiSigTx;
use crate::sigs::{self, SignedTx, StdSignature};

/// Every message the standard router knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Msg {
    Send(SendMsg),
    CreateContract(CreateContractMsg),
    UpdateContract(UpdateContractMsg),
    Batch(Vec<Msg>),
}

impl Msg {
    /// Router path of this message.
    pub fn path(&self) -> &'static str {
        match self {
            Msg::Send(_) => crate::cash::send::SEND_PATH,
            Msg::CreateContract(_) => CREATE_PATH,
            Msg::UpdateContract(_) => UPDATE_PATH,
            Msg::Batch(_) => BATCH_PATH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdTx {
    pub msg: Msg,
    pub fees: Option<FeeInfo>,
    pub signatures: Vec<StdSignature>,
    /// Multisig contract ids to act through, evaluated in order.
    pub multisig: Vec<Vec<u8>>,
    pub preimage: Option<Vec<u8>>,
}

/// Everything a signer commits to: the whole transaction except the
/// signatures.
#[derive(Serialize)]
struct SignBody<'a> {
    msg: &'a Msg,
    fees: &'a Option<FeeInfo>,
    multisig: &'a [Vec<u8>],
    preimage: &'a Option<Vec<u8>>,
}

impl StdTx {
    pub fn new(msg: Msg) -> Self {
        Self {
            msg,
            fees: None,
            signatures: Vec::new(),
            multisig: Vec::new(),
            preimage: None,
        }
    }

    pub fn with_fees(mut self, fees: FeeInfo) -> Self {
        self.fees = Some(fees);
        self
    }

    pub fn with_multisig(mut self, id: Vec<u8>) -> Self {
        self.multisig.push(id);
        self
    }

    pub fn with_preimage(mut self, preimage: Vec<u8>) -> Self {
        self.preimage = Some(preimage);
        self
    }

    /// Appends a signature by `keypair`. Signatures commit to everything
    /// but other signatures, so signers may sign in any order.
    pub fn sign(&mut self, keypair: &Keypair, chain_id: &str, sequence: i64) -> Result<()> {
        let body = self.sign_body()?;
        self.signatures
            .push(sigs::sign(keypair, &body, chain_id, sequence));
        Ok(())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

/// Decodes a raw transaction. Undecodable bytes are an invalid message,
/// not an internal error.
pub fn decode_tx(raw: &[u8]) -> Result<StdTx> {
    bincode::deserialize(raw)
        .map_err(|e| Error::invalid_msg(format!("cannot decode tx: {}", e)))
}

impl Tx for StdTx {
    fn path(&self) -> &str {
        self.msg.path()
    }
}

impl SignedTx for StdTx {
    fn signatures(&self) -> &[StdSignature] {
        &self.signatures
    }

    fn sign_body(&self) -> Result<Vec<u8>> {
        let body = SignBody {
            msg: &self.msg,
            fees: &self.fees,
            multisig: &self.multisig,
            preimage: &self.preimage,
        };
        Ok(bincode::serialize(&body)?)
    }
}

impl MultiSigTx for StdTx {
    fn multisig_ids(&self) -> &[Vec<u8>] {
        &self.multisig
    }
}

impl FeeTx for StdTx {
    fn fee_info(&self) -> Option<&FeeInfo> {
        self.fees.as_ref()
    }
}

impl HashKeyTx for StdTx {
    fn preimage(&self) -> Option<&[u8]> {
        self.preimage.as_deref()
    }
}

impl BatchTx for StdTx {
    /// Each sub-transaction carries one message and the parent's
    /// authentication data. Batches cannot nest.
    fn batch(&self) -> Result<Option<Vec<Self>>> {
        let Msg::Batch(msgs) = &self.msg else {
            return Ok(None);
        };
        check_batch_size(msgs.len())?;
        if msgs.iter().any(|m| matches!(m, Msg::Batch(_))) {
            return Err(Error::invalid_msg("nested batch"));
        }
        Ok(Some(
            msgs.iter()
                .map(|msg| StdTx {
                    msg: msg.clone(),
                    fees: self.fees.clone(),
                    signatures: self.signatures.clone(),
                    multisig: self.multisig.clone(),
                    preimage: self.preimage.clone(),
                })
                .collect(),
        ))
    }
}

/// Wraps `msgs` into a batch message.
pub fn batch_msg(msgs: Vec<Msg>) -> Result<Msg> {
    if msgs.len() > MAX_BATCH_MESSAGES {
        return Err(Error::invalid_msg(format!(
            "batch of {} messages, at most {} allowed",
            msgs.len(),
            MAX_BATCH_MESSAGES
        )));
    }
    Ok(Msg::Batch(msgs))
}
