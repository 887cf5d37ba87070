//! # Protocol Configuration & Constants
//!
//! Every magic number in LOOM lives here. If you're hardcoding a constant
//! somewhere else, move it here first.
//!
//! Runtime configuration (collector address, minimal fee, chain id, debug
//! flag) is NOT in this file. Those are explicit values handed to the
//! components that need them when the stack is built; see
//! [`AppOptions`](crate::app::AppOptions) and the fee configuration in the
//! `cash` extension.

// ---------------------------------------------------------------------------
// Monetary values
// ---------------------------------------------------------------------------

/// Denominator of the fractional part of a coin. One whole unit is
/// `10^9` fractional units.
pub const FRAC_UNIT: i64 = 1_000_000_000;

/// Largest fractional component a normalized coin may carry.
pub const MAX_FRAC: i64 = FRAC_UNIT - 1;

/// Smallest fractional component a normalized coin may carry.
pub const MIN_FRAC: i64 = -MAX_FRAC;

/// Largest whole component a valid coin may carry (`10^15 - 1`).
pub const MAX_WHOLE: i64 = 999_999_999_999_999;

/// Smallest whole component a valid coin may carry.
pub const MIN_WHOLE: i64 = -MAX_WHOLE;

/// Number of decimal places of the fractional part, for display.
pub const FRAC_DIGITS: usize = 9;

// ---------------------------------------------------------------------------
// Addresses
// ---------------------------------------------------------------------------

/// Length of an address in bytes. Addresses are truncated BLAKE3 digests.
pub const ADDRESS_LENGTH: usize = 20;

/// Bech32 human-readable prefix for displayed addresses.
pub const ADDRESS_HRP: &str = "loom";

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// Raw transactions above this size are rejected before decoding.
pub const MAX_TX_SIZE_BYTES: usize = 256 * 1024;

/// Maximum number of messages a single batch may carry.
pub const MAX_BATCH_MESSAGES: usize = 10;

/// Maximum memo length in bytes for value transfers.
pub const MAX_MEMO_LENGTH: usize = 128;

/// Maximum reference length in bytes for value transfers.
pub const MAX_REF_LENGTH: usize = 64;

/// Maximum chain id length. Chain ids are mixed into sign bytes, so they
/// must stay short and printable.
pub const MAX_CHAIN_ID_LENGTH: usize = 64;

/// Gas allocated to a transaction when a handler does not ask for more.
pub const DEFAULT_GAS_ALLOCATED: i64 = 0;

/// Maximum participants a multisig contract may name.
pub const MAX_MULTISIG_PARTICIPANTS: usize = 100;

/// Maximum number of multisig contracts one transaction may reference.
pub const MAX_MULTISIG_REFS: usize = 4;

// ---------------------------------------------------------------------------
// Utility
// ---------------------------------------------------------------------------

/// Returns `true` if `chain_id` is non-empty, short enough, and made of
/// ASCII alphanumerics, `-` and `_` only.
pub fn is_valid_chain_id(chain_id: &str) -> bool {
    !chain_id.is_empty()
        && chain_id.len() <= MAX_CHAIN_ID_LENGTH
        && chain_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fractional_bounds_are_symmetric() {
        assert_eq!(MAX_FRAC, -MIN_FRAC);
        assert_eq!(MAX_FRAC + 1, FRAC_UNIT);
        assert_eq!(10i64.pow(FRAC_DIGITS as u32), FRAC_UNIT);
    }

    #[test]
    fn test_whole_bounds_fit_after_carry() {
        // Normalization adds at most one unit of carry; that must never
        // reach i64 overflow.
        assert!(MAX_WHOLE.checked_add(MAX_WHOLE).is_some());
        assert_eq!(MAX_WHOLE, 10i64.pow(15) - 1);
    }

    #[test]
    fn test_chain_id_validation() {
        assert!(is_valid_chain_id("loom-devnet_1"));
        assert!(!is_valid_chain_id(""));
        assert!(!is_valid_chain_id("with space"));
        assert!(!is_valid_chain_id(&"x".repeat(MAX_CHAIN_ID_LENGTH + 1)));
    }

    #[test]
    fn test_limits_sanity() {
        assert!(MAX_BATCH_MESSAGES > 1);
        assert!(MAX_REF_LENGTH <= MAX_MEMO_LENGTH);
        assert!(MAX_TX_SIZE_BYTES > 0);
    }
}
