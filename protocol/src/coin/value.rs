//! Single-ticker fixed-point values.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CoinError;
use crate::config::{FRAC_DIGITS, FRAC_UNIT, MAX_FRAC, MAX_WHOLE, MIN_FRAC, MIN_WHOLE};

/// Returns `true` if `ticker` is 3 or 4 uppercase ASCII letters.
pub fn is_valid_ticker(ticker: &str) -> bool {
    (3..=4).contains(&ticker.len()) && ticker.bytes().all(|b| b.is_ascii_uppercase())
}

/// A signed fixed-point amount of one currency.
///
/// The value is `whole + fractional / 10^9`. Constructors do not normalize;
/// every arithmetic operation returns a normalized result.
///
/// # Examples
///
/// ```
/// use loom_protocol::coin::Coin;
///
/// let a = Coin::new(1, 600_000_000, "IOV");
/// let b = Coin::new(0, 700_000_000, "IOV");
/// assert_eq!(a.add(&b).unwrap(), Coin::new(2, 300_000_000, "IOV"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Coin {
    pub ticker: String,
    pub whole: i64,
    pub fractional: i64,
}

impl Coin {
    pub fn new(whole: i64, fractional: i64, ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            whole,
            fractional,
        }
    }

    /// A zero amount of `ticker`.
    pub fn zero(ticker: impl Into<String>) -> Self {
        Self::new(0, 0, ticker)
    }

    /// The ticker. Coins are keyed by it inside a [`Coins`](super::Coins) set.
    pub fn id(&self) -> &str {
        &self.ticker
    }

    pub fn is_zero(&self) -> bool {
        self.whole == 0 && self.fractional == 0
    }

    pub fn is_positive(&self) -> bool {
        self.whole > 0 || (self.whole == 0 && self.fractional > 0)
    }

    pub fn is_non_negative(&self) -> bool {
        self.whole >= 0 && self.fractional >= 0
    }

    pub fn same_type(&self, other: &Coin) -> bool {
        self.ticker == other.ticker
    }

    /// Sums two coins of the same ticker.
    ///
    /// A zero coin without a ticker is the identity on either side. Any
    /// other ticker mismatch is an error, and a sum outside the valid
    /// range reports [`CoinError::Overflow`].
    pub fn add(&self, other: &Coin) -> Result<Coin, CoinError> {
        if self.ticker.is_empty() && self.is_zero() {
            return Ok(other.clone());
        }
        if other.ticker.is_empty() && other.is_zero() {
            return Ok(self.clone());
        }
        if !self.same_type(other) {
            return Err(CoinError::CurrencyMismatch {
                left: self.ticker.clone(),
                right: other.ticker.clone(),
            });
        }

        let whole = self
            .whole
            .checked_add(other.whole)
            .ok_or(CoinError::Overflow)?;
        let fractional = self
            .fractional
            .checked_add(other.fractional)
            .ok_or(CoinError::Overflow)?;

        Coin::new(whole, fractional, self.ticker.clone())
            .normalize()
            .map_err(|_| CoinError::Overflow)
    }

    /// The same amount with the opposite sign.
    pub fn negative(&self) -> Coin {
        Coin::new(
            self.whole.saturating_neg(),
            self.fractional.saturating_neg(),
            self.ticker.clone(),
        )
    }

    pub fn subtract(&self, other: &Coin) -> Result<Coin, CoinError> {
        self.add(&other.negative())
    }

    /// Scales the coin by `times`.
    ///
    /// Both components are multiplied with overflow checks, the fractional
    /// carry is moved into the whole part, and a result outside the valid
    /// range is reported as [`CoinError::Overflow`].
    pub fn multiply(&self, times: i64) -> Result<Coin, CoinError> {
        if times == 0 || self.is_zero() {
            return Ok(Coin::zero(self.ticker.clone()));
        }

        let whole = self.whole.checked_mul(times).ok_or(CoinError::Overflow)?;
        let fractional = self
            .fractional
            .checked_mul(times)
            .ok_or(CoinError::Overflow)?;
        let whole = whole
            .checked_add(fractional / FRAC_UNIT)
            .ok_or(CoinError::Overflow)?;

        Coin::new(whole, fractional % FRAC_UNIT, self.ticker.clone())
            .normalize()
            .map_err(|_| CoinError::Overflow)
    }

    /// Splits the coin into `pieces` equal parts.
    ///
    /// Returns one piece and the fractional leftover that could not be
    /// divided evenly, so that `piece * pieces + rest == self`. A whole
    /// remainder is moved into the fractional part before dividing.
    pub fn divide(&self, pieces: i64) -> Result<(Coin, Coin), CoinError> {
        if pieces <= 0 {
            return Err(CoinError::InvalidDivisor(pieces));
        }

        let mut fractional = self.fractional;
        let leftover = self.whole % pieces;
        if leftover != 0 {
            fractional = leftover
                .checked_mul(FRAC_UNIT)
                .and_then(|carried| carried.checked_add(fractional))
                .ok_or(CoinError::Overflow)?;
        }

        let one = Coin::new(self.whole / pieces, fractional / pieces, self.ticker.clone());
        let rest = Coin::new(0, fractional % pieces, self.ticker.clone());
        Ok((one, rest))
    }

    /// Orders two normalized values, ignoring the ticker.
    pub fn compare(&self, other: &Coin) -> Ordering {
        self.whole
            .cmp(&other.whole)
            .then(self.fractional.cmp(&other.fractional))
    }

    /// `true` if both coins share a ticker and `self >= other`.
    pub fn is_gte(&self, other: &Coin) -> bool {
        self.same_type(other) && self.compare(other) != Ordering::Less
    }

    /// Checks ticker format, component ranges and sign agreement.
    ///
    /// Negative values pass; callers that need positive amounts check
    /// that themselves. A zero coin without a ticker is valid.
    pub fn validate(&self) -> Result<(), CoinError> {
        if self.ticker.is_empty() && self.is_zero() {
            return Ok(());
        }
        if !is_valid_ticker(&self.ticker) {
            return Err(CoinError::InvalidTicker(self.ticker.clone()));
        }
        if !(MIN_WHOLE..=MAX_WHOLE).contains(&self.whole)
            || !(MIN_FRAC..=MAX_FRAC).contains(&self.fractional)
        {
            return Err(CoinError::OutOfRange);
        }
        if self.whole != 0 && self.fractional != 0 && (self.whole > 0) != (self.fractional > 0) {
            return Err(CoinError::MismatchedSign);
        }
        Ok(())
    }

    /// Carries the fractional part into range and makes both components
    /// share a sign. Fails if the whole part ends up out of range.
    pub fn normalize(&self) -> Result<Coin, CoinError> {
        let mut whole = self
            .whole
            .checked_add(self.fractional / FRAC_UNIT)
            .ok_or(CoinError::OutOfRange)?;
        let mut fractional = self.fractional % FRAC_UNIT;

        if whole > 0 && fractional < 0 {
            whole -= 1;
            fractional += FRAC_UNIT;
        } else if whole < 0 && fractional > 0 {
            whole += 1;
            fractional -= FRAC_UNIT;
        }

        if !(MIN_WHOLE..=MAX_WHOLE).contains(&whole) {
            return Err(CoinError::OutOfRange);
        }
        Ok(Coin::new(whole, fractional, self.ticker.clone()))
    }
}

impl fmt::Display for Coin {
    /// Renders `12.5 IOV`, `-0.000000001 IOV` or `7 IOV`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.whole < 0 || self.fractional < 0 {
            "-"
        } else {
            ""
        };
        write!(f, "{}{}", sign, self.whole.unsigned_abs())?;
        if self.fractional != 0 {
            let digits = format!(
                "{:0width$}",
                self.fractional.unsigned_abs(),
                width = FRAC_DIGITS
            );
            write!(f, ".{}", digits.trim_end_matches('0'))?;
        }
        if !self.ticker.is_empty() {
            write!(f, " {}", self.ticker)?;
        }
        Ok(())
    }
}

impl FromStr for Coin {
    type Err = CoinError;

    /// Parses `"<amount> <TICKER>"`, where the amount has at most nine
    /// decimal places. The parsed coin is validated.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse_err = |reason: &str| CoinError::Parse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.split_whitespace();
        let (amount, ticker) = match (parts.next(), parts.next(), parts.next()) {
            (Some(amount), Some(ticker), None) => (amount, ticker),
            _ => return Err(parse_err("expected \"<amount> <TICKER>\"")),
        };

        let (negative, digits) = match amount.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, amount),
        };
        let (whole_str, frac_str) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole_str.is_empty() || !whole_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(parse_err("invalid whole part"));
        }
        if frac_str.len() > FRAC_DIGITS || !frac_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(parse_err("invalid fractional part"));
        }
        if digits.ends_with('.') {
            return Err(parse_err("missing digits after decimal point"));
        }

        let whole: i64 = whole_str
            .parse()
            .map_err(|_| parse_err("whole part too large"))?;
        let fractional: i64 = if frac_str.is_empty() {
            0
        } else {
            format!("{:0<width$}", frac_str, width = FRAC_DIGITS)
                .parse()
                .map_err(|_| parse_err("invalid fractional part"))?
        };

        let coin = if negative {
            Coin::new(-whole, -fractional, ticker)
        } else {
            Coin::new(whole, fractional, ticker)
        };
        coin.validate()?;
        Ok(coin)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
