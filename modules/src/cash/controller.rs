//! Wallet balances and transfers.

use tracing::debug;

use loom_protocol::auth::Address;
use loom_protocol::coin::{Coin, Coins};
use loom_protocol::errors::{Error, ErrorKind, Result};
use loom_protocol::store::{Bucket, KvStore};

/// Balances by address.
pub const WALLETS: Bucket<Coins> = Bucket::new("cash");

/// Moves funds between accounts. Implementations must either apply the
/// whole transfer or nothing.
pub trait CoinMover {
    fn move_coins(
        &self,
        store: &mut dyn KvStore,
        from: &Address,
        to: &Address,
        amount: &Coin,
    ) -> Result<()>;
}

/// The wallet-backed [`CoinMover`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Controller;

impl Controller {
    pub fn new() -> Self {
        Self
    }

    /// Current balance of `addr`. Empty if the account was never funded.
    pub fn balance(&self, store: &dyn KvStore, addr: &Address) -> Result<Coins> {
        Ok(WALLETS.get(store, addr.as_bytes())?.unwrap_or_default())
    }

    /// Creates `amount` out of thin air in `to`. Used for genesis balances.
    pub fn issue_coins(&self, store: &mut dyn KvStore, to: &Address, amount: &Coin) -> Result<()> {
        check_amount(amount)?;
        let balance = self.balance(store, to)?.add(amount)?;
        save(store, to, &balance)?;
        debug!(to = %to, amount = %amount, "coins issued");
        Ok(())
    }
}

impl CoinMover for Controller {
    fn move_coins(
        &self,
        store: &mut dyn KvStore,
        from: &Address,
        to: &Address,
        amount: &Coin,
    ) -> Result<()> {
        check_amount(amount)?;

        let sender = self.balance(store, from)?;
        if !sender.contains(amount) {
            return Err(Error::new(
                ErrorKind::InsufficientAmount,
                format!("{} has {}, needs {}", from, sender, amount),
            ));
        }
        let sender = sender.subtract(amount)?;
        let recipient = if from == to {
            sender.clone()
        } else {
            self.balance(store, to)?
        };
        let recipient = recipient.add(amount)?;

        // both balances are computed before either is written
        if from != to {
            save(store, from, &sender)?;
        }
        save(store, to, &recipient)?;
        debug!(from = %from, to = %to, amount = %amount, "coins moved");
        Ok(())
    }
}

fn check_amount(amount: &Coin) -> Result<()> {
    amount.validate()?;
    if !amount.is_positive() {
        return Err(Error::new(
            ErrorKind::InvalidCoin,
            format!("non-positive amount {}", amount),
        ));
    }
    Ok(())
}

fn save(store: &mut dyn KvStore, addr: &Address, balance: &Coins) -> Result<()> {
    if balance.is_empty() {
        WALLETS.delete(store, addr.as_bytes())
    } else {
        WALLETS.save(store, addr.as_bytes(), balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loom_protocol::store::MemStore;
    use proptest::prelude::*;

    fn iov(whole: i64, fractional: i64) -> Coin {
        Coin::new(whole, fractional, "IOV")
    }

    const ALICE: Address = Address::from_bytes([1; 20]);
    const BOB: Address = Address::from_bytes([2; 20]);

    #[test]
    fn move_transfers_exact_amount() {
        let mut store = MemStore::new();
        let ctrl = Controller::new();
        ctrl.issue_coins(&mut store, &ALICE, &iov(10, 0)).unwrap();
        ctrl.move_coins(&mut store, &ALICE, &BOB, &iov(2, 500_000_000)).unwrap();

        assert_eq!(ctrl.balance(&store, &ALICE).unwrap().get("IOV"), Some(&iov(7, 500_000_000)));
        assert_eq!(ctrl.balance(&store, &BOB).unwrap().get("IOV"), Some(&iov(2, 500_000_000)));
    }

    #[test]
    fn insufficient_funds_leave_store_untouched() {
        let mut store = MemStore::new();
        let ctrl = Controller::new();
        ctrl.issue_coins(&mut store, &ALICE, &iov(1, 0)).unwrap();
        let before = store.clone();

        let err = ctrl.move_coins(&mut store, &ALICE, &BOB, &iov(1, 1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);
        assert_eq!(store, before);

        let err = ctrl
            .move_coins(&mut store, &ALICE, &BOB, &Coin::new(1, 0, "ETH"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);
    }

    #[test]
    fn emptied_wallet_is_deleted() {
        let mut store = MemStore::new();
        let ctrl = Controller::new();
        ctrl.issue_coins(&mut store, &ALICE, &iov(3, 0)).unwrap();
        ctrl.move_coins(&mut store, &ALICE, &BOB, &iov(3, 0)).unwrap();
        assert_eq!(WALLETS.get(&store, ALICE.as_bytes()).unwrap(), None);
        assert!(ctrl.balance(&store, &ALICE).unwrap().is_empty());
    }

    #[test]
    fn self_transfer_is_a_no_op() {
        let mut store = MemStore::new();
        let ctrl = Controller::new();
        ctrl.issue_coins(&mut store, &ALICE, &iov(5, 0)).unwrap();
        ctrl.move_coins(&mut store, &ALICE, &ALICE, &iov(4, 0)).unwrap();
        assert_eq!(ctrl.balance(&store, &ALICE).unwrap().get("IOV"), Some(&iov(5, 0)));
    }

    #[test]
    fn non_positive_amounts_are_rejected() {
        let mut store = MemStore::new();
        let ctrl = Controller::new();
        for amount in [iov(0, 0), iov(-1, 0)] {
            let err = ctrl.move_coins(&mut store, &ALICE, &BOB, &amount).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidCoin);
        }
    }

    fn total(ctrl: &Controller, store: &MemStore) -> Coin {
        [ALICE, BOB]
            .iter()
            .filter_map(|a| ctrl.balance(store, a).unwrap().get("IOV").cloned())
            .fold(Coin::zero("IOV"), |acc, c| acc.add(&c).unwrap())
    }

    proptest! {
        #[test]
        fn transfers_conserve_supply(
            moves in proptest::collection::vec((any::<bool>(), 0i64..4, 0i64..1_000_000_000), 1..20)
        ) {
            let mut store = MemStore::new();
            let ctrl = Controller::new();
            ctrl.issue_coins(&mut store, &ALICE, &iov(5, 0)).unwrap();
            ctrl.issue_coins(&mut store, &BOB, &iov(5, 0)).unwrap();

            for (forward, whole, fractional) in moves {
                let (from, to) = if forward { (ALICE, BOB) } else { (BOB, ALICE) };
                // failures must not change anything
                let _ = ctrl.move_coins(&mut store, &from, &to, &iov(whole, fractional));
                prop_assert_eq!(total(&ctrl, &store), iov(10, 0));
            }
        }
    }
}
