//! Fee enforcement.
//!
//! The stage validates the declared fee against the configured minimum,
//! checks that the payer authorized the transaction and moves the fee to
//! the collector before calling the rest of the pipeline. In the check
//! phase it also raises the transaction's pool priority by the paid fee,
//! one point per fractional unit.
//!
//! [`DynamicFeeDecorator`] additionally lets the handler price the
//! transaction: the fee actually paid must cover the `required_fee` the
//! handler reports, or the transaction fails without paying anything.

use tracing::debug;

use loom_protocol::app::{CheckResult, Decorator, DeliverResult, Handler};
use loom_protocol::auth::{main_signer, Address, Authenticator};
use loom_protocol::coin::Coin;
use loom_protocol::config::FRAC_UNIT;
use loom_protocol::context::Context;
use loom_protocol::errors::{Error, ErrorKind, Result, ResultExt};
use loom_protocol::store::{CacheWrap, KvStore};

use super::{CoinMover, FeeConfig, FeeInfo, FeeTx};

pub struct FeeDecorator<A, C> {
    auth: A,
    mover: C,
    config: FeeConfig,
}

impl<A: Authenticator, C: CoinMover> FeeDecorator<A, C> {
    pub fn new(auth: A, mover: C, config: FeeConfig) -> Self {
        Self {
            auth,
            mover,
            config,
        }
    }

    pub fn config(&self) -> &FeeConfig {
        &self.config
    }

    /// Resolves the fee to collect, if any. `None` means the transaction
    /// pays nothing and is allowed to.
    fn extract_fee<T: FeeTx>(&self, ctx: &Context, tx: &T) -> Result<Option<(Address, Coin)>> {
        let signer = main_signer(ctx, &self.auth).map(|c| c.address());
        let info = tx
            .fee_info()
            .cloned()
            .unwrap_or_default()
            .default_payer(signer);

        let minimum = &self.config.minimal_fee;
        if info.fees.is_zero() {
            if minimum.is_zero() {
                return Ok(None);
            }
            return Err(Error::new(
                ErrorKind::InsufficientAmount,
                format!("fees {}, minimum {}", info.fees, minimum),
            ));
        }

        info.validate()?;

        if !minimum.is_zero() {
            if minimum.ticker.is_empty() {
                return Err(Error::new(ErrorKind::InvalidCurrency, "minimal fee has no ticker"));
            }
            if !info.fees.same_type(minimum) {
                return Err(Error::new(
                    ErrorKind::InvalidCurrency,
                    format!("{} vs fee {}", minimum.ticker, info.fees.ticker),
                ));
            }
            if !info.fees.is_gte(minimum) {
                return Err(Error::new(
                    ErrorKind::InsufficientAmount,
                    format!("fees {}, minimum {}", info.fees, minimum),
                ));
            }
        }

        let FeeInfo { payer, fees } = info;
        let payer =
            payer.ok_or_else(|| Error::unauthorized("fee payer signature missing"))?;
        Ok(Some((payer, fees)))
    }

    /// Resolves the fee and checks that its payer authorized the
    /// transaction. Nothing is moved yet.
    fn authorized_fee<T: FeeTx>(
        &self,
        ctx: &Context,
        tx: &T,
    ) -> Result<Option<(Address, Coin)>> {
        let Some((payer, fees)) = self.extract_fee(ctx, tx)? else {
            return Ok(None);
        };
        if !self.auth.has_address(ctx, &payer) {
            return Err(Error::unauthorized("fee payer signature missing"));
        }
        Ok(Some((payer, fees)))
    }

    fn pay(&self, store: &mut dyn KvStore, payer: &Address, fees: &Coin) -> Result<()> {
        self.mover.move_coins(store, payer, &self.config.collector, fees)?;
        debug!(payer = %payer, fees = %fees, "fee collected");
        Ok(())
    }

    /// Validates and collects the fee. Returns what was paid.
    fn collect<T: FeeTx>(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
    ) -> Result<Option<Coin>> {
        let Some((payer, fees)) = self.authorized_fee(ctx, tx)? else {
            return Ok(None);
        };
        self.pay(store, &payer, &fees)?;
        Ok(Some(fees))
    }
}

/// Pool priority of a fee: one point per fractional unit, saturating.
pub fn to_payment(fee: &Coin) -> i64 {
    fee.whole
        .saturating_mul(FRAC_UNIT)
        .saturating_add(fee.fractional)
}

impl<A: Authenticator, C: CoinMover, T: FeeTx> Decorator<T> for FeeDecorator<A, C> {
    fn name(&self) -> &'static str {
        "fee"
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        let paid = self.collect(ctx, store, tx).wrap("fee")?;
        let mut res = next.check(ctx, store, tx)?;
        if let Some(fees) = paid {
            res.gas_payment = res.gas_payment.saturating_add(to_payment(&fees));
        }
        Ok(res)
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        self.collect(ctx, store, tx).wrap("fee")?;
        next.deliver(ctx, store, tx)
    }
}

// ---------------------------------------------------------------------------
// Handler-priced fees
// ---------------------------------------------------------------------------

/// Fee stage that also enforces the fee a handler asks for through
/// `required_fee`.
///
/// The declared fee is collected inside a savepoint before the rest of the
/// pipeline runs. A failing handler still pays. A handler that succeeds
/// but requires more than was paid fails the transaction, and the fee and
/// every write below this stage are dropped.
pub struct DynamicFeeDecorator<A, C> {
    fees: FeeDecorator<A, C>,
}

impl<A: Authenticator, C: CoinMover> DynamicFeeDecorator<A, C> {
    pub fn new(auth: A, mover: C, config: FeeConfig) -> Self {
        Self {
            fees: FeeDecorator::new(auth, mover, config),
        }
    }

    pub fn config(&self) -> &FeeConfig {
        self.fees.config()
    }

    fn run<T: FeeTx, R>(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: impl FnOnce(&mut dyn KvStore) -> Result<R>,
        required: impl Fn(&R) -> &Coin,
    ) -> Result<(Option<Coin>, R)> {
        let paid = self.fees.authorized_fee(ctx, tx).wrap("fee")?;

        let mut wrap = CacheWrap::new(store);
        if let Some((payer, fees)) = &paid {
            self.fees.pay(&mut wrap, payer, fees).wrap("fee")?;
        }
        let res = match next(&mut wrap) {
            Ok(res) => res,
            Err(err) => {
                wrap.commit()?;
                return Err(err);
            }
        };

        let paid = paid.map(|(_, fees)| fees);
        check_required(paid.as_ref(), required(&res)).wrap("fee")?;
        wrap.commit()?;
        Ok((paid, res))
    }
}

/// Fails unless `paid` covers `required`. A zero requirement always
/// passes.
fn check_required(paid: Option<&Coin>, required: &Coin) -> Result<()> {
    if required.is_zero() {
        return Ok(());
    }
    match paid {
        Some(fees) if !fees.same_type(required) => Err(Error::new(
            ErrorKind::InvalidCurrency,
            format!("{} vs fee {}", required.ticker, fees.ticker),
        )),
        Some(fees) if fees.is_gte(required) => Ok(()),
        _ => Err(Error::new(
            ErrorKind::InsufficientAmount,
            format!(
                "fees {}, required {}",
                paid.map_or_else(|| "0".to_string(), ToString::to_string),
                required
            ),
        )),
    }
}

impl<A: Authenticator, C: CoinMover, T: FeeTx> Decorator<T> for DynamicFeeDecorator<A, C> {
    fn name(&self) -> &'static str {
        "dynamic-fee"
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        let (paid, mut res) = self.run(
            ctx,
            store,
            tx,
            |store| next.check(ctx, store, tx),
            |res: &CheckResult| &res.required_fee,
        )?;
        if let Some(fees) = paid {
            res.gas_payment = res.gas_payment.saturating_add(to_payment(&fees));
        }
        Ok(res)
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        let (_, res) = self.run(
            ctx,
            store,
            tx,
            |store| next.deliver(ctx, store, tx),
            |res: &DeliverResult| &res.required_fee,
        )?;
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cash::Controller;
    use crate::sigs;
    use chrono::Utc;
    use loom_protocol::app::{Decorators, Tx};
    use loom_protocol::auth::{ChainAuth, Condition};
    use loom_protocol::store::MemStore;

    struct Paying(Option<FeeInfo>);

    impl Tx for Paying {
        fn path(&self) -> &str {
            "test/paying"
        }
    }

    impl FeeTx for Paying {
        fn fee_info(&self) -> Option<&FeeInfo> {
            self.0.as_ref()
        }
    }

    struct Ok7;

    impl Handler<Paying> for Ok7 {
        fn check(&self, _: &Context, _: &mut dyn KvStore, _: &Paying) -> Result<CheckResult> {
            Ok(CheckResult {
                gas_payment: 7,
                ..Default::default()
            })
        }

        fn deliver(&self, _: &Context, _: &mut dyn KvStore, _: &Paying) -> Result<DeliverResult> {
            Ok(DeliverResult::default())
        }
    }

    const COLLECTOR: Address = Address::from_bytes([0xcc; 20]);

    fn alice() -> Condition {
        Condition::new(sigs::NAMESPACE, sigs::KIND, b"alice")
    }

    fn iov(whole: i64, fractional: i64) -> Coin {
        Coin::new(whole, fractional, "IOV")
    }

    fn decorator(minimal_fee: Coin) -> FeeDecorator<ChainAuth, Controller> {
        FeeDecorator::new(
            ChainAuth::new().with(sigs::authenticator()),
            Controller::new(),
            FeeConfig {
                collector: COLLECTOR,
                minimal_fee,
            },
        )
    }

    fn signed_ctx() -> Context {
        Context::new("loom-test", 1, Utc::now()).with_conditions(sigs::NAMESPACE, vec![alice()])
    }

    fn funded() -> MemStore {
        let mut store = MemStore::new();
        Controller::new()
            .issue_coins(&mut store, &alice().address(), &iov(10, 0))
            .unwrap();
        store
    }

    fn run_check(
        d: FeeDecorator<ChainAuth, Controller>,
        store: &mut MemStore,
        tx: &Paying,
    ) -> Result<CheckResult> {
        let stack = Decorators::new().chain(d).with_handler(Ok7);
        stack.check(&signed_ctx(), store, tx)
    }

    #[test]
    fn no_fee_and_no_minimum_passes_unchanged() {
        let mut store = funded();
        let before = store.clone();
        let res = run_check(decorator(Coin::default()), &mut store, &Paying(None)).unwrap();
        assert_eq!(res.gas_payment, 7);
        assert_eq!(store, before);
    }

    #[test]
    fn zero_fee_below_minimum_is_insufficient() {
        let mut store = funded();
        let tx = Paying(Some(FeeInfo::new(iov(0, 0))));
        let err = run_check(decorator(iov(1, 0)), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);

        let err = run_check(decorator(iov(1, 0)), &mut store, &Paying(None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);
    }

    #[test]
    fn fee_is_moved_and_scored() {
        let mut store = funded();
        let tx = Paying(Some(FeeInfo::new(iov(1, 500))));
        let res = run_check(decorator(iov(1, 0)), &mut store, &tx).unwrap();
        assert_eq!(res.gas_payment, 7 + 1_000_000_500);

        let ctrl = Controller::new();
        assert_eq!(ctrl.balance(&store, &COLLECTOR).unwrap().get("IOV"), Some(&iov(1, 500)));
        assert_eq!(
            ctrl.balance(&store, &alice().address()).unwrap().get("IOV"),
            Some(&iov(8, 999_999_500))
        );
    }

    #[test]
    fn deliver_collects_without_scoring() {
        let mut store = funded();
        let tx = Paying(Some(FeeInfo::new(iov(2, 0))));
        let stack = Decorators::new().chain(decorator(Coin::default())).with_handler(Ok7);
        let res = stack.deliver(&signed_ctx(), &mut store, &tx).unwrap();
        assert_eq!(res, DeliverResult::default());
        assert_eq!(
            Controller::new().balance(&store, &COLLECTOR).unwrap().get("IOV"),
            Some(&iov(2, 0))
        );
    }

    #[test]
    fn wrong_currency_and_low_fee_are_rejected() {
        let mut store = funded();
        let tx = Paying(Some(FeeInfo::new(Coin::new(5, 0, "ETH"))));
        let err = run_check(decorator(iov(1, 0)), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCurrency);

        let tx = Paying(Some(FeeInfo::new(iov(0, 999_999_999))));
        let err = run_check(decorator(iov(1, 0)), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);

        let tx = Paying(Some(FeeInfo::new(iov(1, 0))));
        let err = run_check(decorator(Coin::new(1, 0, "")), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCurrency);
    }

    #[test]
    fn payer_must_have_signed() {
        let mut store = funded();
        let stranger = Address::from_bytes([0xee; 20]);
        let tx = Paying(Some(FeeInfo::new(iov(1, 0)).with_payer(stranger)));
        let err = run_check(decorator(Coin::default()), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.to_string(), "fee: unauthorized: fee payer signature missing");
    }

    #[test]
    fn insufficient_balance_fails_whole_fee() {
        let mut store = funded();
        let before = store.clone();
        let tx = Paying(Some(FeeInfo::new(iov(11, 0))));
        let err = run_check(decorator(Coin::default()), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);
        assert_eq!(store, before);
    }

    /// Writes a marker and asks for `required` on success, or fails.
    struct Priced {
        required: Coin,
        fail: bool,
    }

    impl Priced {
        fn asking(required: Coin) -> Self {
            Self {
                required,
                fail: false,
            }
        }

        fn touch(&self, store: &mut dyn KvStore) -> Result<()> {
            store.set(b"priced".to_vec(), b"1".to_vec())?;
            if self.fail {
                return Err(Error::invalid_msg("rejected"));
            }
            Ok(())
        }
    }

    impl Handler<Paying> for Priced {
        fn check(&self, _: &Context, store: &mut dyn KvStore, _: &Paying) -> Result<CheckResult> {
            self.touch(store)?;
            Ok(CheckResult {
                required_fee: self.required.clone(),
                ..Default::default()
            })
        }

        fn deliver(
            &self,
            _: &Context,
            store: &mut dyn KvStore,
            _: &Paying,
        ) -> Result<DeliverResult> {
            self.touch(store)?;
            Ok(DeliverResult {
                required_fee: self.required.clone(),
                ..Default::default()
            })
        }
    }

    fn dynamic(minimal_fee: Coin) -> DynamicFeeDecorator<ChainAuth, Controller> {
        DynamicFeeDecorator::new(
            ChainAuth::new().with(sigs::authenticator()),
            Controller::new(),
            FeeConfig {
                collector: COLLECTOR,
                minimal_fee,
            },
        )
    }

    fn collected(store: &MemStore) -> Option<Coin> {
        Controller::new()
            .balance(store, &COLLECTOR)
            .unwrap()
            .get("IOV")
            .cloned()
    }

    #[test]
    fn required_fee_above_declared_rejects_without_paying() {
        let stack = Decorators::new()
            .chain(dynamic(Coin::default()))
            .with_handler(Priced::asking(iov(2, 0)));
        let tx = Paying(Some(FeeInfo::new(iov(1, 0))));

        let mut store = funded();
        let before = store.clone();
        let err = stack.check(&signed_ctx(), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);
        assert_eq!(err.to_string(), "fee: insufficient amount: fees 1 IOV, required 2 IOV");
        assert_eq!(store, before);

        let err = stack.deliver(&signed_ctx(), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);
        assert_eq!(store, before);
    }

    #[test]
    fn required_fee_counts_even_without_declared_fee() {
        let stack = Decorators::new()
            .chain(dynamic(Coin::default()))
            .with_handler(Priced::asking(iov(0, 1)));
        let mut store = funded();
        let err = stack.deliver(&signed_ctx(), &mut store, &Paying(None)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);
        assert!(!store.has(b"priced").unwrap());
    }

    #[test]
    fn covered_required_fee_is_collected_and_scored() {
        let stack = Decorators::new()
            .chain(dynamic(iov(1, 0)))
            .with_handler(Priced::asking(iov(2, 0)));
        let tx = Paying(Some(FeeInfo::new(iov(2, 0))));

        let mut store = funded();
        let res = stack.check(&signed_ctx(), &mut store, &tx).unwrap();
        assert_eq!(res.gas_payment, 2_000_000_000);
        assert_eq!(res.required_fee, iov(2, 0));
        assert_eq!(collected(&store), Some(iov(2, 0)));
        assert!(store.has(b"priced").unwrap());

        let res = stack.deliver(&signed_ctx(), &mut store, &tx).unwrap();
        assert_eq!(res.required_fee, iov(2, 0));
        assert_eq!(collected(&store), Some(iov(4, 0)));
    }

    #[test]
    fn configured_minimum_still_applies() {
        let stack = Decorators::new()
            .chain(dynamic(iov(3, 0)))
            .with_handler(Priced::asking(iov(1, 0)));
        let tx = Paying(Some(FeeInfo::new(iov(2, 0))));
        let mut store = funded();
        let err = stack.deliver(&signed_ctx(), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientAmount);
        assert_eq!(collected(&store), None);
    }

    #[test]
    fn failing_handler_still_pays_declared_fee() {
        let stack = Decorators::new().chain(dynamic(Coin::default())).with_handler(Priced {
            required: iov(5, 0),
            fail: true,
        });
        let tx = Paying(Some(FeeInfo::new(iov(1, 0))));
        let mut store = funded();
        let err = stack.deliver(&signed_ctx(), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMsg);
        assert_eq!(collected(&store), Some(iov(1, 0)));
    }

    #[test]
    fn required_fee_in_other_currency_is_rejected() {
        let stack = Decorators::new()
            .chain(dynamic(Coin::default()))
            .with_handler(Priced::asking(Coin::new(1, 0, "ETH")));
        let tx = Paying(Some(FeeInfo::new(iov(5, 0))));
        let mut store = funded();
        let before = store.clone();
        let err = stack.deliver(&signed_ctx(), &mut store, &tx).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCurrency);
        assert_eq!(store, before);
    }

    #[test]
    fn payment_saturates() {
        assert_eq!(to_payment(&iov(2, 5)), 2_000_000_005);
        assert_eq!(to_payment(&Coin::new(i64::MAX, 0, "IOV")), i64::MAX);
    }
}
