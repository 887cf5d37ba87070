//! Normalized multi-currency sets.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{is_valid_ticker, Coin, CoinError};

/// Merges `coins` into a normalized set.
///
/// Entries of the same ticker are summed, zero results are dropped and the
/// remainder is sorted by ticker. Tickers are not validated, and inputs do
/// not need to be normalized on their own as long as their sums are.
pub fn normalize_coins<I>(coins: I) -> Result<Coins, CoinError>
where
    I: IntoIterator<Item = Coin>,
{
    let mut merged: BTreeMap<String, Coin> = BTreeMap::new();
    for coin in coins {
        match merged.get_mut(&coin.ticker) {
            Some(acc) => *acc = acc.add(&coin)?,
            None => {
                merged.insert(coin.ticker.clone(), coin);
            }
        }
    }

    let mut out = Vec::with_capacity(merged.len());
    for coin in merged.into_values() {
        let coin = coin.normalize()?;
        if !coin.is_zero() {
            out.push(coin);
        }
    }
    Ok(Coins(out))
}

/// A sorted set of coins holding at most one non-zero entry per ticker.
///
/// Every constructor normalizes, so a `Coins` value always satisfies
/// [`Coins::validate`] except for ticker format, which only
/// [`Coins::combine_coins`] and `validate` enforce.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Coins(Vec<Coin>);

impl Coins {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Builds a set from arbitrary coins, rejecting invalid tickers and an
    /// invalid result. Out-of-range inputs are accepted if they cancel out.
    pub fn combine_coins<I>(coins: I) -> Result<Coins, CoinError>
    where
        I: IntoIterator<Item = Coin>,
    {
        let coins: Vec<Coin> = coins.into_iter().collect();
        if let Some(bad) = coins.iter().find(|c| !is_valid_ticker(&c.ticker)) {
            return Err(CoinError::InvalidTicker(bad.ticker.clone()));
        }
        let set = normalize_coins(coins)?;
        set.validate()?;
        Ok(set)
    }

    /// Checks that the set is sorted, unique, zero-free, and that every
    /// coin is valid.
    pub fn validate(&self) -> Result<(), CoinError> {
        for coin in &self.0 {
            coin.validate()?;
        }
        if !self.is_normalized() {
            return Err(CoinError::NotNormalized);
        }
        Ok(())
    }

    /// `true` if tickers are strictly ascending and no entry is zero.
    pub fn is_normalized(&self) -> bool {
        self.0.iter().all(|c| !c.is_zero())
            && self.0.windows(2).all(|w| w[0].ticker < w[1].ticker)
    }

    /// Returns a new set with `coin` added.
    pub fn add(&self, coin: &Coin) -> Result<Coins, CoinError> {
        normalize_coins(self.0.iter().cloned().chain(std::iter::once(coin.clone())))
    }

    /// Returns a new set with `coin` subtracted. Balances may go negative;
    /// callers that forbid it check [`is_non_negative`](Self::is_non_negative).
    pub fn subtract(&self, coin: &Coin) -> Result<Coins, CoinError> {
        self.add(&coin.negative())
    }

    /// Returns the sum of both sets. Neither input is modified.
    pub fn combine(&self, other: &Coins) -> Result<Coins, CoinError> {
        normalize_coins(self.0.iter().chain(other.0.iter()).cloned())
    }

    /// `true` if the set holds at least `coin` of its ticker.
    pub fn contains(&self, coin: &Coin) -> bool {
        self.get(&coin.ticker).is_some_and(|held| held.is_gte(coin))
    }

    pub fn get(&self, ticker: &str) -> Option<&Coin> {
        self.0
            .binary_search_by(|c| c.ticker.as_str().cmp(ticker))
            .ok()
            .map(|idx| &self.0[idx])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_non_negative(&self) -> bool {
        self.0.iter().all(Coin::is_non_negative)
    }

    pub fn into_vec(self) -> Vec<Coin> {
        self.0
    }
}

impl<'a> IntoIterator for &'a Coins {
    type Item = &'a Coin;
    type IntoIter = std::slice::Iter<'a, Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", coin)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
