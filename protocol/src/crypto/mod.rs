//! # Cryptographic Primitives
//!
//! Thin wrappers over audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for transaction signatures.
//! - **BLAKE3** for addresses, contract ids, sign bytes and store roots.
//! - **SHA-256** for hashlock preimages, where the digest is chosen by
//!   whoever locks the funds and is expected to be portable.

pub mod hash;
pub mod keys;

pub use hash::{blake3_hash, blake3_hash_parts, merkle_root, sha256};
pub use keys::{KeyError, Keypair, PublicKey, Signature};
