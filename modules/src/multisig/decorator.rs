//! Pipeline stage that evaluates multisig contracts.

use tracing::debug;

use loom_protocol::app::{CheckResult, Decorator, DeliverResult, Handler};
use loom_protocol::auth::Authenticator;
use loom_protocol::context::Context;
use loom_protocol::errors::Result;
use loom_protocol::store::KvStore;

use super::{
    admin_condition, contract_not_found, unauthorized_multisig, usage_condition, validate_ids,
    MultiSigTx, CONTRACTS, NAMESPACE,
};

/// Evaluates every contract a transaction names against the conditions
/// proven by earlier stages. Transactions naming no contract pass through
/// untouched.
pub struct MultisigDecorator<A> {
    auth: A,
}

impl<A: Authenticator> MultisigDecorator<A> {
    /// `auth` decides which participants have signed. It should include
    /// the multisig authenticator itself so contracts can be participants
    /// of other contracts.
    pub fn new(auth: A) -> Self {
        Self { auth }
    }

    fn authenticate<T: MultiSigTx>(
        &self,
        ctx: &Context,
        store: &dyn KvStore,
        tx: &T,
    ) -> Result<Context> {
        let ids = tx.multisig_ids();
        validate_ids(ids)?;

        let mut ctx = ctx.clone();
        for id in ids {
            let contract = CONTRACTS
                .get(store, id)?
                .ok_or_else(|| contract_not_found(id))?;

            let signed = contract
                .participants
                .iter()
                .filter(|p| self.auth.has_address(&ctx, p))
                .count() as u32;
            if signed < contract.activation_threshold {
                return Err(unauthorized_multisig(id));
            }

            let mut conds = vec![usage_condition(id)];
            if signed >= contract.admin_threshold {
                conds.push(admin_condition(id));
            }
            debug!(
                contract = %hex::encode(id),
                signed,
                admin = conds.len() > 1,
                "multisig satisfied"
            );
            ctx = ctx.with_conditions(NAMESPACE, conds);
        }
        Ok(ctx)
    }
}

impl<A: Authenticator, T: MultiSigTx> Decorator<T> for MultisigDecorator<A> {
    fn name(&self) -> &'static str {
        "multisig"
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        let ctx = self.authenticate(ctx, store, tx)?;
        next.check(&ctx, store, tx)
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        let ctx = self.authenticate(ctx, store, tx)?;
        next.deliver(&ctx, store, tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multisig::{authenticator, contract_address, Contract};
    use crate::sigs;
    use chrono::Utc;
    use loom_protocol::app::Tx;
    use loom_protocol::auth::{ChainAuth, Condition};
    use loom_protocol::errors::ErrorKind;
    use loom_protocol::store::MemStore;

    struct ContractTx(Vec<Vec<u8>>);

    impl Tx for ContractTx {
        fn path(&self) -> &str {
            "test/contract"
        }
    }

    impl MultiSigTx for ContractTx {
        fn multisig_ids(&self) -> &[Vec<u8>] {
            &self.0
        }
    }

    fn signer(name: &str) -> Condition {
        Condition::new(sigs::NAMESPACE, sigs::KIND, name.as_bytes())
    }

    fn decorator() -> MultisigDecorator<ChainAuth> {
        MultisigDecorator::new(ChainAuth::new().with(sigs::authenticator()).with(authenticator()))
    }

    fn signed_by(names: &[&str]) -> Context {
        Context::new("loom-test", 1, Utc::now())
            .with_conditions(sigs::NAMESPACE, names.iter().map(|n| signer(n)).collect())
    }

    fn store_contract(store: &mut MemStore, contract: &Contract) -> Vec<u8> {
        let id = contract.content_id().unwrap();
        CONTRACTS.save(store, &id, contract).unwrap();
        id
    }

    fn abc(store: &mut MemStore) -> Vec<u8> {
        let participants = ["a", "b", "c"].iter().map(|n| signer(n).address()).collect();
        store_contract(store, &Contract::new(participants, 2, 3))
    }

    #[test]
    fn activation_and_admin_thresholds() {
        let mut store = MemStore::new();
        let id = abc(&mut store);
        let d = decorator();
        let tx = ContractTx(vec![id.clone()]);

        let ctx = d.authenticate(&signed_by(&["a", "b"]), &store, &tx).unwrap();
        assert_eq!(authenticator().conditions(&ctx), vec![usage_condition(&id)]);

        let ctx = d.authenticate(&signed_by(&["a", "b", "c"]), &store, &tx).unwrap();
        assert_eq!(
            authenticator().conditions(&ctx),
            vec![usage_condition(&id), admin_condition(&id)]
        );

        match d.authenticate(&signed_by(&["a"]), &store, &tx) {
            Err(err) if err.is(ErrorKind::UnauthorizedMultisig) => {
                assert_eq!(err.message(), hex::encode(&id));
            }
            other => panic!("expected UnauthorizedMultisig, got {:?}", other),
        }
    }

    #[test]
    fn outsiders_do_not_count() {
        let mut store = MemStore::new();
        let id = abc(&mut store);
        let tx = ContractTx(vec![id]);
        let err = decorator()
            .authenticate(&signed_by(&["a", "mallory", "eve"]), &store, &tx)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnauthorizedMultisig);
    }

    #[test]
    fn unknown_contract_is_not_found() {
        let store = MemStore::new();
        let tx = ContractTx(vec![b"bad id".to_vec()]);
        match decorator().authenticate(&signed_by(&["a", "b"]), &store, &tx) {
            Err(err) if err.is(ErrorKind::ContractNotFound) => {
                assert_eq!(err.message(), hex::encode(b"bad id"));
            }
            other => panic!("expected ContractNotFound, got {:?}", other),
        }
    }

    #[test]
    fn no_ids_is_pass_through() {
        let store = MemStore::new();
        let ctx = signed_by(&["a"]);
        let out = decorator().authenticate(&ctx, &store, &ContractTx(vec![])).unwrap();
        assert_eq!(out, ctx);
    }

    #[test]
    fn contracts_can_sign_for_later_contracts() {
        let mut store = MemStore::new();
        let inner = abc(&mut store);
        let outer = store_contract(
            &mut store,
            &Contract::new(vec![contract_address(&inner), signer("d").address()], 2, 2),
        );

        let tx = ContractTx(vec![inner.clone(), outer.clone()]);
        let ctx = decorator()
            .authenticate(&signed_by(&["a", "b", "d"]), &store, &tx)
            .unwrap();
        let conds = authenticator().conditions(&ctx);
        assert!(conds.contains(&usage_condition(&inner)));
        assert!(conds.contains(&usage_condition(&outer)));
        assert!(conds.contains(&admin_condition(&outer)));

        // the order matters: the outer contract is evaluated first here
        let tx = ContractTx(vec![outer.clone(), inner]);
        let err = decorator()
            .authenticate(&signed_by(&["a", "b", "d"]), &store, &tx)
            .unwrap_err();
        assert_eq!(err.message(), hex::encode(&outer));
    }
}
