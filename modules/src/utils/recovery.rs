//! Panic recovery.

use std::panic::{self, AssertUnwindSafe};

use tracing::error;

use loom_protocol::app::{CheckResult, Decorator, DeliverResult, Handler, Tx};
use loom_protocol::context::Context;
use loom_protocol::errors::{Error, Result};
use loom_protocol::store::KvStore;

/// Turns a panic anywhere below this stage into an internal error for
/// that transaction only.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recovery;

impl Recovery {
    pub fn new() -> Self {
        Self
    }
}

fn recover<R>(path: &str, call: impl FnOnce() -> Result<R>) -> Result<R> {
    panic::catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let err = Error::from_panic(payload);
        error!(path, error = %err, "recovered from panic");
        Err(err)
    })
}

impl<T: Tx> Decorator<T> for Recovery {
    fn name(&self) -> &'static str {
        "recovery"
    }

    fn check(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<CheckResult> {
        recover(tx.path(), || next.check(ctx, store, tx))
    }

    fn deliver(
        &self,
        ctx: &Context,
        store: &mut dyn KvStore,
        tx: &T,
        next: &dyn Handler<T>,
    ) -> Result<DeliverResult> {
        recover(tx.path(), || next.deliver(ctx, store, tx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loom_protocol::app::Decorators;
    use loom_protocol::errors::ErrorKind;
    use loom_protocol::store::MemStore;

    struct Boom;

    impl Tx for Boom {
        fn path(&self) -> &str {
            "test/boom"
        }
    }

    struct Panicking;

    impl Handler<Boom> for Panicking {
        fn check(&self, _: &Context, _: &mut dyn KvStore, _: &Boom) -> Result<CheckResult> {
            let empty: Vec<u8> = Vec::new();
            Ok(CheckResult {
                data: vec![empty[3]],
                ..Default::default()
            })
        }

        fn deliver(&self, _: &Context, _: &mut dyn KvStore, _: &Boom) -> Result<DeliverResult> {
            panic!("out of gas")
        }
    }

    #[test]
    fn panics_become_internal_errors() {
        let stack = Decorators::new().chain(Recovery::new()).with_handler(Panicking);
        let ctx = Context::new("loom-test", 1, Utc::now());
        let mut store = MemStore::new();

        let err = stack.check(&ctx, &mut store, &Boom).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.message().starts_with("panic: index out of bounds"));

        let err = stack.deliver(&ctx, &mut store, &Boom).unwrap_err();
        assert_eq!(err.message(), "panic: out of gas");
        assert_eq!(err.redacted(), "internal error");
    }
}
