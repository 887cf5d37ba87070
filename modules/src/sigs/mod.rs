//! # Signature Verification
//!
//! Every signature on a transaction proves one condition,
//! `sigs/ed25519/<pubkey>`, as long as it verifies over the transaction's
//! sign bytes and carries the signer's current sequence.
//!
//! ## Replay protection
//!
//! Each signer has a [`UserData`] record holding its next expected
//! sequence. A signature must carry exactly that number and the counter
//! is advanced once the signature verifies. The sequence is mixed into the
//! signed digest together with the chain id:
//!
//! ```text
//! digest = BLAKE3( len(chain_id) || chain_id || sequence (BE) || body )
//! ```
//!
//! so a signature can neither be replayed on the same chain nor on a
//! different one.

pub mod decorator;

pub use decorator::SigsDecorator;

use serde::{Deserialize, Serialize};

use loom_protocol::app::Tx;
use loom_protocol::auth::{Address, Condition, ContextAuth};
use loom_protocol::context::Context;
use loom_protocol::crypto::{blake3_hash_parts, Keypair, PublicKey, Signature};
use loom_protocol::errors::{Error, ErrorKind, Result};
use loom_protocol::store::{Bucket, KvStore};

/// Namespace of signature conditions.
pub const NAMESPACE: &str = "sigs";

/// Condition kind of an Ed25519 key.
pub const KIND: &str = "ed25519";

/// Signer records, keyed by the signer's address.
pub const USERS: Bucket<UserData> = Bucket::new("sigs");

/// A transaction that can carry signatures.
pub trait SignedTx: Tx {
    fn signatures(&self) -> &[StdSignature];

    /// The bytes every signer commits to. Must exclude the signatures.
    fn sign_body(&self) -> Result<Vec<u8>>;
}

/// One signature with the public key and sequence it was made with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    pub pubkey: PublicKey,
    pub signature: Signature,
    pub sequence: i64,
}

/// Per-signer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub pubkey: PublicKey,
    /// Sequence the next signature must carry.
    pub sequence: i64,
}

/// The condition proven by a valid signature of `pubkey`.
pub fn condition(pubkey: &PublicKey) -> Condition {
    Condition::new(NAMESPACE, KIND, pubkey.as_bytes())
}

/// The address of the account controlled by `pubkey`.
pub fn address(pubkey: &PublicKey) -> Address {
    condition(pubkey).address()
}

/// Reads conditions proven by [`SigsDecorator`].
pub const fn authenticator() -> ContextAuth {
    ContextAuth::new(NAMESPACE)
}

/// Digest a signer signs for `body` at `sequence` on `chain_id`.
pub fn sign_bytes(body: &[u8], chain_id: &str, sequence: i64) -> [u8; 32] {
    let chain_len = (chain_id.len() as u32).to_be_bytes();
    let seq = sequence.to_be_bytes();
    blake3_hash_parts(&[&chain_len[..], chain_id.as_bytes(), &seq[..], body])
}

/// Signs `body` for `chain_id` with the given sequence.
pub fn sign(keypair: &Keypair, body: &[u8], chain_id: &str, sequence: i64) -> StdSignature {
    let digest = sign_bytes(body, chain_id, sequence);
    StdSignature {
        pubkey: keypair.public_key(),
        signature: keypair.sign(&digest),
        sequence,
    }
}

/// Next sequence expected from `pubkey`. Zero for unknown signers.
pub fn next_sequence(store: &dyn KvStore, pubkey: &PublicKey) -> Result<i64> {
    Ok(USERS
        .get(store, address(pubkey).as_bytes())?
        .map(|user| user.sequence)
        .unwrap_or(0))
}

/// Verifies every signature of `tx`, advances each signer's sequence and
/// returns the proven conditions in signature order.
pub fn verify_tx_signatures<T: SignedTx>(
    ctx: &Context,
    store: &mut dyn KvStore,
    tx: &T,
) -> Result<Vec<Condition>> {
    let sigs = tx.signatures();
    if sigs.is_empty() {
        return Ok(Vec::new());
    }
    let body = tx.sign_body()?;
    let mut conds = Vec::with_capacity(sigs.len());
    for sig in sigs {
        conds.push(verify_signature(store, sig, &body, ctx.chain_id())?);
    }
    Ok(conds)
}

/// Verifies one signature against the signer's stored sequence and bumps
/// it on success.
pub fn verify_signature(
    store: &mut dyn KvStore,
    sig: &StdSignature,
    body: &[u8],
    chain_id: &str,
) -> Result<Condition> {
    let cond = condition(&sig.pubkey);
    let addr = cond.address();
    let mut user = USERS.get(store, addr.as_bytes())?.unwrap_or(UserData {
        pubkey: sig.pubkey,
        sequence: 0,
    });

    if sig.sequence != user.sequence {
        return Err(Error::new(
            ErrorKind::InvalidSequence,
            format!("expected {} got {}", user.sequence, sig.sequence),
        ));
    }
    let digest = sign_bytes(body, chain_id, sig.sequence);
    if !sig.pubkey.verify(&digest, &sig.signature) {
        return Err(Error::unauthorized("invalid signature"));
    }

    user.sequence = user
        .sequence
        .checked_add(1)
        .ok_or_else(|| Error::new(ErrorKind::Overflow, "sequence"))?;
    USERS.save(store, addr.as_bytes(), &user)?;
    Ok(cond)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loom_protocol::store::MemStore;

    struct Signed {
        body: Vec<u8>,
        sigs: Vec<StdSignature>,
    }

    impl Tx for Signed {
        fn path(&self) -> &str {
            "test/signed"
        }
    }

    impl SignedTx for Signed {
        fn signatures(&self) -> &[StdSignature] {
            &self.sigs
        }

        fn sign_body(&self) -> Result<Vec<u8>> {
            Ok(self.body.clone())
        }
    }

    fn ctx() -> Context {
        Context::new("loom-test", 1, Utc::now())
    }

    #[test]
    fn valid_signatures_prove_conditions_and_bump_sequence() {
        let alice = Keypair::from_seed(&[1u8; 32]);
        let bob = Keypair::from_seed(&[2u8; 32]);
        let body = b"send 10 IOV".to_vec();
        let tx = Signed {
            sigs: vec![
                sign(&alice, &body, "loom-test", 0),
                sign(&bob, &body, "loom-test", 0),
            ],
            body,
        };

        let mut store = MemStore::new();
        let conds = verify_tx_signatures(&ctx(), &mut store, &tx).unwrap();
        assert_eq!(
            conds,
            vec![condition(&alice.public_key()), condition(&bob.public_key())]
        );
        assert_eq!(next_sequence(&store, &alice.public_key()).unwrap(), 1);

        // the same transaction cannot be replayed
        let err = verify_tx_signatures(&ctx(), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSequence);
        assert_eq!(err.message(), "expected 1 got 0");
    }

    #[test]
    fn signature_from_another_chain_is_rejected() {
        let alice = Keypair::from_seed(&[1u8; 32]);
        let body = b"payload".to_vec();
        let tx = Signed {
            sigs: vec![sign(&alice, &body, "other-chain", 0)],
            body,
        };
        let mut store = MemStore::new();
        let err = verify_tx_signatures(&ctx(), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(next_sequence(&store, &alice.public_key()).unwrap(), 0);
    }

    #[test]
    fn tampered_body_is_rejected() {
        let alice = Keypair::from_seed(&[1u8; 32]);
        let tx = Signed {
            sigs: vec![sign(&alice, b"send 1 IOV", "loom-test", 0)],
            body: b"send 1000 IOV".to_vec(),
        };
        let mut store = MemStore::new();
        match verify_tx_signatures(&ctx(), &mut store, &tx) {
            Err(err) if err.is(ErrorKind::Unauthorized) => {}
            other => panic!("expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn unsigned_transactions_prove_nothing() {
        let tx = Signed {
            sigs: vec![],
            body: vec![],
        };
        let mut store = MemStore::new();
        assert!(verify_tx_signatures(&ctx(), &mut store, &tx).unwrap().is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn sign_bytes_depend_on_every_input() {
        let base = sign_bytes(b"body", "loom", 3);
        assert_ne!(base, sign_bytes(b"body", "loom", 4));
        assert_ne!(base, sign_bytes(b"body", "loom2", 3));
        assert_ne!(base, sign_bytes(b"bodz", "loom", 3));
        // the chain id length prefix keeps these apart
        assert_ne!(sign_bytes(b"xbody", "loom", 3), sign_bytes(b"body", "loomx", 3));
    }
}
