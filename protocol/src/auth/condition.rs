//! Conditions and addresses.

use std::fmt;
use std::str::FromStr;

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ADDRESS_HRP, ADDRESS_LENGTH};
use crate::crypto::blake3_hash;
use crate::errors::{Error, ErrorKind};

/// Errors from parsing an [`Address`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("bech32 decode error: {0}")]
    Bech32(String),

    #[error("invalid HRP: expected '{expected}', got '{got}'")]
    InvalidHrp { expected: String, got: String },

    #[error("invalid address length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },
}

impl From<AddressError> for Error {
    #[track_caller]
    fn from(err: AddressError) -> Self {
        Error::new(ErrorKind::InvalidInput, err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Condition
// ---------------------------------------------------------------------------

/// An authorization token: `"{namespace}/{kind}/"` followed by raw data.
///
/// Equality is byte identity. A condition is never stored; only the
/// [`Address`] derived from it is.
///
/// ```
/// use loom_protocol::auth::Condition;
///
/// let cond = Condition::new("hash", "sha256", &[0xab; 32]);
/// let (ns, kind, data) = cond.parse().unwrap();
/// assert_eq!((ns, kind, data.len()), ("hash", "sha256", 32));
/// ```
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Condition(Vec<u8>);

impl Condition {
    pub fn new(namespace: &str, kind: &str, data: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(namespace.len() + kind.len() + 2 + data.len());
        bytes.extend_from_slice(namespace.as_bytes());
        bytes.push(b'/');
        bytes.extend_from_slice(kind.as_bytes());
        bytes.push(b'/');
        bytes.extend_from_slice(data);
        Self(bytes)
    }

    /// Wraps raw bytes without checking the layout.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Splits into `(namespace, kind, data)`. Returns `None` if the prefix
    /// is missing or not UTF-8.
    pub fn parse(&self) -> Option<(&str, &str, &[u8])> {
        let first = self.0.iter().position(|&b| b == b'/')?;
        let rest = &self.0[first + 1..];
        let second = rest.iter().position(|&b| b == b'/')?;
        let namespace = std::str::from_utf8(&self.0[..first]).ok()?;
        let kind = std::str::from_utf8(&rest[..second]).ok()?;
        if namespace.is_empty() || kind.is_empty() {
            return None;
        }
        Some((namespace, kind, &rest[second + 1..]))
    }

    /// The address this condition controls: the first 20 bytes of its
    /// BLAKE3 digest.
    pub fn address(&self) -> Address {
        let digest = blake3_hash(&self.0);
        let mut out = [0u8; ADDRESS_LENGTH];
        out.copy_from_slice(&digest[..ADDRESS_LENGTH]);
        Address(out)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Condition {
    /// `ns/kind/<hex data>`, or plain hex for malformed conditions.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parse() {
            Some((ns, kind, data)) => write!(f, "{}/{}/{}", ns, kind, hex::encode(data)),
            None => f.write_str(&hex::encode(&self.0)),
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Condition({})", self)
    }
}

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// Twenty opaque bytes identifying an account. Displayed as Bech32 with
/// the `loom` prefix.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address([u8; ADDRESS_LENGTH]);

impl Address {
    pub const fn from_bytes(bytes: [u8; ADDRESS_LENGTH]) -> Self {
        Self(bytes)
    }

    pub fn try_from_slice(slice: &[u8]) -> Result<Self, AddressError> {
        let bytes: [u8; ADDRESS_LENGTH] =
            slice.try_into().map_err(|_| AddressError::InvalidLength {
                expected: ADDRESS_LENGTH,
                got: slice.len(),
            })?;
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    fn from_bech32(s: &str) -> Result<Self, AddressError> {
        let (hrp, data) = bech32::decode(s).map_err(|e| AddressError::Bech32(e.to_string()))?;
        let expected = Hrp::parse(ADDRESS_HRP).map_err(|e| AddressError::Bech32(e.to_string()))?;
        if hrp != expected {
            return Err(AddressError::InvalidHrp {
                expected: ADDRESS_HRP.to_string(),
                got: hrp.to_string(),
            });
        }
        Self::try_from_slice(&data)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    /// Accepts the Bech32 form or 40 hex characters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() == ADDRESS_LENGTH * 2 {
            if let Ok(bytes) = hex::decode(s) {
                return Self::try_from_slice(&bytes);
            }
        }
        Self::from_bech32(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hrp = Hrp::parse(ADDRESS_HRP).map_err(|_| fmt::Error)?;
        let encoded = bech32::encode::<Bech32>(hrp, &self.0).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl From<&Condition> for Address {
    fn from(cond: &Condition) -> Self {
        cond.address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_layout_and_parse() {
        let cond = Condition::new("sigs", "ed25519", b"\x01\x02");
        assert_eq!(cond.as_bytes(), b"sigs/ed25519/\x01\x02");
        assert_eq!(cond.parse(), Some(("sigs", "ed25519", &b"\x01\x02"[..])));
        assert_eq!(cond.to_string(), "sigs/ed25519/0102");
    }

    #[test]
    fn data_may_contain_slashes() {
        let cond = Condition::new("hash", "sha256", b"a/b/c");
        assert_eq!(cond.parse(), Some(("hash", "sha256", &b"a/b/c"[..])));
    }

    #[test]
    fn malformed_conditions_do_not_parse() {
        assert_eq!(Condition::from_bytes(b"noslash".to_vec()).parse(), None);
        assert_eq!(Condition::from_bytes(b"one/slash".to_vec()).parse(), None);
        assert_eq!(Condition::from_bytes(b"//data".to_vec()).parse(), None);
    }

    #[test]
    fn address_is_deterministic_and_distinct() {
        let a = Condition::new("sigs", "ed25519", b"alice");
        let b = Condition::new("sigs", "ed25519", b"bob");
        assert_eq!(a.address(), a.clone().address());
        assert_ne!(a.address(), b.address());
        assert_eq!(&a.address().as_bytes()[..], &blake3_hash(a.as_bytes())[..20]);
    }

    #[test]
    fn address_bech32_and_hex_roundtrip() {
        let addr = Condition::new("sigs", "ed25519", b"carol").address();
        let shown = addr.to_string();
        assert!(shown.starts_with("loom1"));
        assert_eq!(shown.parse::<Address>().unwrap(), addr);
        assert_eq!(addr.to_hex().parse::<Address>().unwrap(), addr);
    }

    #[test]
    fn address_rejects_bad_input() {
        let hrp = Hrp::parse("cosmos").unwrap();
        let foreign = bech32::encode::<Bech32>(hrp, &[0u8; 20]).unwrap();
        match foreign.parse::<Address>() {
            Err(AddressError::InvalidHrp { got, .. }) => assert_eq!(got, "cosmos"),
            other => panic!("expected InvalidHrp, got {:?}", other),
        }

        let hrp = Hrp::parse(ADDRESS_HRP).unwrap();
        let short = bech32::encode::<Bech32>(hrp, &[0u8; 8]).unwrap();
        assert_eq!(
            short.parse::<Address>(),
            Err(AddressError::InvalidLength { expected: 20, got: 8 })
        );

        assert!(matches!("garbage".parse::<Address>(), Err(AddressError::Bech32(_))));
    }
}
