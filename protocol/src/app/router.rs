//! Path-based message dispatch.

use std::collections::BTreeMap;

use tracing::debug;

use super::handler::{CheckResult, DeliverResult, Handler, Tx};
use crate::context::Context;
use crate::errors::{Error, ErrorKind, Result};
use crate::store::KvStore;

/// Dispatches a transaction to the handler registered for its exact path.
pub struct Router<T> {
    routes: BTreeMap<String, Box<dyn Handler<T>>>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }
}

impl<T> Router<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `path`. Registering a path twice is a
    /// wiring bug and fails.
    pub fn register(&mut self, path: &str, handler: impl Handler<T> + 'static) -> Result<()> {
        if self.routes.contains_key(path) {
            return Err(Error::new(
                ErrorKind::Duplicate,
                format!("route {} already registered", path),
            ));
        }
        debug!(path, "route registered");
        self.routes.insert(path.to_string(), Box::new(handler));
        Ok(())
    }

    /// Registered paths in lexical order.
    pub fn paths(&self) -> Vec<&str> {
        self.routes.keys().map(String::as_str).collect()
    }

    fn route(&self, path: &str) -> Result<&dyn Handler<T>> {
        self.routes
            .get(path)
            .map(|h| h.as_ref())
            .ok_or_else(|| Error::invalid_msg(format!("unknown message type {}", path)))
    }
}

impl<T: Tx> Handler<T> for Router<T> {
    fn check(&self, ctx: &Context, store: &mut dyn KvStore, tx: &T) -> Result<CheckResult> {
        self.route(tx.path())?.check(ctx, store, tx)
    }

    fn deliver(&self, ctx: &Context, store: &mut dyn KvStore, tx: &T) -> Result<DeliverResult> {
        self.route(tx.path())?.deliver(ctx, store, tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use chrono::Utc;

    struct Msg(&'static str);

    impl Tx for Msg {
        fn path(&self) -> &str {
            self.0
        }
    }

    struct Echo(&'static str);

    impl Handler<Msg> for Echo {
        fn check(&self, _: &Context, _: &mut dyn KvStore, _: &Msg) -> Result<CheckResult> {
            Ok(CheckResult {
                log: self.0.to_string(),
                ..Default::default()
            })
        }

        fn deliver(&self, _: &Context, _: &mut dyn KvStore, _: &Msg) -> Result<DeliverResult> {
            Ok(DeliverResult {
                data: self.0.as_bytes().to_vec(),
                ..Default::default()
            })
        }
    }

    fn router() -> Router<Msg> {
        let mut r = Router::new();
        r.register("cash/send", Echo("send")).unwrap();
        r.register("multisig/create", Echo("create")).unwrap();
        r
    }

    #[test]
    fn dispatches_by_exact_path() {
        let r = router();
        let ctx = Context::new("loom-test", 1, Utc::now());
        let mut store = MemStore::new();
        assert_eq!(r.check(&ctx, &mut store, &Msg("cash/send")).unwrap().log, "send");
        assert_eq!(
            r.deliver(&ctx, &mut store, &Msg("multisig/create")).unwrap().data,
            b"create".to_vec()
        );
        assert_eq!(r.paths(), vec!["cash/send", "multisig/create"]);
    }

    #[test]
    fn unknown_path_is_invalid_message() {
        let r = router();
        let ctx = Context::new("loom-test", 1, Utc::now());
        let mut store = MemStore::new();
        for path in ["cash", "cash/send/extra", ""] {
            let err = r.check(&ctx, &mut store, &Msg(path)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidMsg);
            assert!(err.message().starts_with("unknown message type"));
        }
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut r = router();
        let err = r.register("cash/send", Echo("again")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Duplicate);
    }
}
