//! # Hashing Utilities
//!
//! BLAKE3 is the default everywhere LOOM derives an identifier. SHA-256 is
//! only used where the preimage scheme has to match external tooling
//! (hashlocks).

use sha2::{Digest, Sha256};

/// BLAKE3 digest of `data`.
///
/// ```
/// use loom_protocol::crypto::blake3_hash;
///
/// assert_eq!(blake3_hash(b"loom").len(), 32);
/// ```
pub fn blake3_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// BLAKE3 over several parts without concatenating them first.
pub fn blake3_hash_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for part in parts {
        hasher.update(part);
    }
    *hasher.finalize().as_bytes()
}

/// SHA-256 digest of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Binary Merkle root over already-ordered leaves.
///
/// An odd node at the end of a level is paired with itself. No leaves
/// gives the all-zero root.
///
/// ```text
/// level[i+1][j] = BLAKE3(level[i][2j] || level[i][2j+1])
/// ```
pub fn merkle_root(leaves: Vec<[u8; 32]>) -> [u8; 32] {
    let mut level = leaves;
    if level.is_empty() {
        return [0u8; 32];
    }

    while level.len() > 1 {
        level = level
            .chunks(2)
            .map(|pair| {
                let right = pair.get(1).unwrap_or(&pair[0]);
                blake3_hash_parts(&[&pair[0][..], &right[..]])
            })
            .collect();
    }
    level[0]
}

/// Leaf hash of one key/value entry. The key length is mixed in so that
/// `("ab", "c")` and `("a", "bc")` do not collide.
pub fn kv_leaf(key: &[u8], value: &[u8]) -> [u8; 32] {
    let len = (key.len() as u64).to_be_bytes();
    blake3_hash_parts(&[&len[..], key, value])
}
