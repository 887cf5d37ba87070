//! The standard stage order.
//!
//! ```text
//!  logging ─► recovery ─► keytagger ─► savepoint-check ─► sigs ─► multisig
//!     ─► dynamic-fee ─► hashlock ─► batch ─► savepoint-deliver ─► router
//! ```
//!
//! The fee stage also enforces any `required_fee` a handler reports. It
//! runs before hashlock, so fees cannot be paid from an account unlocked
//! by a preimage alone. The batch stage runs before the deliver savepoint
//! so a batch is split before any handler runs.

use loom_protocol::app::{AppOptions, BaseApp, Decorators, Router, Stack};
use loom_protocol::auth::ChainAuth;
use loom_protocol::errors::Result;
use loom_protocol::store::CommitStore;

use crate::batch::BatchDecorator;
use crate::cash::send::SEND_PATH;
use crate::cash::{Controller, DynamicFeeDecorator, FeeConfig, SendHandler};
use crate::hashlock::{self, HashlockDecorator};
use crate::multisig::handlers::{CREATE_PATH, UPDATE_PATH};
use crate::multisig::{self, CreateContractHandler, MultisigDecorator, UpdateContractHandler};
use crate::sigs::{self, SigsDecorator};
use crate::tx::{decode_tx, StdTx};
use crate::utils::{KeyTagger, Logging, Recovery, Savepoint};

/// Every condition a transaction can prove: signatures, preimages and
/// satisfied contracts.
pub fn authenticator() -> ChainAuth {
    ChainAuth::new()
        .with(sigs::authenticator())
        .with(hashlock::authenticator())
        .with(multisig::authenticator())
}

/// The standard decorator chain, without a terminal handler.
pub fn chain(fees: FeeConfig) -> Decorators<StdTx> {
    Decorators::new()
        .chain(Logging::new())
        .chain(Recovery::new())
        .chain(KeyTagger::new())
        .chain(Savepoint::on_check())
        .chain(SigsDecorator::new())
        .chain(MultisigDecorator::new(authenticator()))
        .chain(DynamicFeeDecorator::new(authenticator(), Controller::new(), fees))
        .chain(HashlockDecorator::new())
        .chain(BatchDecorator::new())
        .chain(Savepoint::on_deliver())
}

/// Routes for every message of [`Msg`](crate::tx::Msg) except batches,
/// which the batch stage expands.
pub fn router() -> Result<Router<StdTx>> {
    let mut router = Router::new();
    router.register(SEND_PATH, SendHandler::new(authenticator(), Controller::new()))?;
    router.register(CREATE_PATH, CreateContractHandler)?;
    router.register(UPDATE_PATH, UpdateContractHandler::new(authenticator()))?;
    Ok(router)
}

pub fn standard_stack(fees: FeeConfig) -> Result<Stack<StdTx>> {
    Ok(chain(fees).with_handler(router()?))
}

/// A [`BaseApp`] over `store` running the standard stack.
pub fn application<S: CommitStore>(
    store: S,
    options: AppOptions,
    fees: FeeConfig,
) -> Result<BaseApp<StdTx, S>> {
    BaseApp::new(store, options, decode_tx, standard_stack(fees)?)
}
