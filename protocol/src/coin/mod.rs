//! # Coin Module — Fixed-Point Multi-Currency Values
//!
//! Every fee, every transfer, every balance in LOOM is expressed with the
//! types in this module. A [`Coin`] is a signed fixed-point amount scoped
//! to a ticker; [`Coins`] is a normalized set of them, at most one per
//! ticker.
//!
//! ## Architecture
//!
//! ```text
//! value.rs  — single-ticker value: arithmetic, normalization, validation
//! set.rs    — sorted, duplicate-free, zero-free set of coins
//! ```
//!
//! ## Representation
//!
//! A value is split into `whole` and `fractional` parts with a fixed
//! denominator of `10^9` ([`FRAC_UNIT`](crate::config::FRAC_UNIT)):
//!
//! ```text
//! value = whole + fractional / 10^9
//! ```
//!
//! Both parts are `i64`. A normalized coin keeps
//! `|fractional| < 10^9`, `|whole| <= 10^15 - 1`, and both parts share a
//! sign. No floating point, and every operation that could wrap checks
//! first and returns [`CoinError::Overflow`] instead.

pub mod set;
pub mod value;

pub use set::{normalize_coins, Coins};
pub use value::{is_valid_ticker, Coin};

use thiserror::Error;

use crate::errors::{Error, ErrorKind};

/// Errors produced by coin arithmetic and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoinError {
    /// The ticker is not 3–4 uppercase ASCII letters.
    #[error("invalid ticker {0:?}")]
    InvalidTicker(String),

    /// Two coins of different currencies were combined.
    #[error("currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    /// A component is outside the representable range.
    #[error("value out of range")]
    OutOfRange,

    /// `whole` and `fractional` have opposite signs.
    #[error("mismatched sign")]
    MismatchedSign,

    /// A coin set is unsorted, has duplicate tickers or holds a zero entry.
    #[error("coins are not normalized")]
    NotNormalized,

    /// An operation would exceed the representable range.
    #[error("overflow")]
    Overflow,

    /// Division by zero or by a negative number of pieces.
    #[error("pieces must be greater than zero, got {0}")]
    InvalidDivisor(i64),

    /// A human-readable amount could not be parsed.
    #[error("cannot parse {input:?}: {reason}")]
    Parse { input: String, reason: String },
}

impl From<CoinError> for Error {
    #[track_caller]
    fn from(err: CoinError) -> Self {
        let kind = match err {
            CoinError::InvalidTicker(_) | CoinError::CurrencyMismatch { .. } => {
                ErrorKind::InvalidCurrency
            }
            CoinError::OutOfRange | CoinError::MismatchedSign | CoinError::NotNormalized => {
                ErrorKind::InvalidCoin
            }
            CoinError::Overflow => ErrorKind::Overflow,
            CoinError::InvalidDivisor(_) | CoinError::Parse { .. } => ErrorKind::InvalidInput,
        };
        Error::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coin_errors_map_to_kinds() {
        let cases = [
            (CoinError::InvalidTicker("io".into()), ErrorKind::InvalidCurrency),
            (
                CoinError::CurrencyMismatch {
                    left: "IOV".into(),
                    right: "ETH".into(),
                },
                ErrorKind::InvalidCurrency,
            ),
            (CoinError::OutOfRange, ErrorKind::InvalidCoin),
            (CoinError::MismatchedSign, ErrorKind::InvalidCoin),
            (CoinError::NotNormalized, ErrorKind::InvalidCoin),
            (CoinError::Overflow, ErrorKind::Overflow),
            (CoinError::InvalidDivisor(0), ErrorKind::InvalidInput),
        ];
        for (err, kind) in cases {
            assert_eq!(Error::from(err).kind(), kind);
        }

        let err = Error::from(CoinError::MismatchedSign);
        assert_eq!(err.to_string(), "invalid coin: mismatched sign");
    }
}
