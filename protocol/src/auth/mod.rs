//! # Conditions and Authenticators
//!
//! Permissions in LOOM are expressed as [`Condition`]s: opaque tokens that
//! say "this transaction was authorized by X", where X can be a key, a
//! disclosed secret or a multisig contract. Every component that cares
//! about authorization asks the same question through an
//! [`Authenticator`]: is this condition (or address) present?
//!
//! ## Architecture
//!
//! ```text
//!   sigs stage ──┐
//!   multisig  ───┼──► Context (conditions by namespace) ──► ContextAuth("sigs")
//!   hashlock  ───┘                                          ContextAuth("multisig")
//!                                                           ContextAuth("hash")
//!                                                                 │
//!                                                     ChainAuth (union, in order)
//!                                                                 │
//!                                              fee stage, handlers, main_signer
//! ```
//!
//! Each authenticating stage verifies its own evidence, records the
//! conditions it proved in the [`Context`] under its namespace, and calls
//! the next stage. An authenticator reads those conditions back, so it is
//! deterministic and free of side effects for the whole call.

pub mod condition;

pub use condition::{Address, AddressError, Condition};

use crate::context::Context;

/// Produces the conditions a transaction has proven.
pub trait Authenticator {
    fn conditions(&self, ctx: &Context) -> Vec<Condition>;

    /// `true` if any condition derives to `addr`.
    fn has_address(&self, ctx: &Context, addr: &Address) -> bool {
        self.conditions(ctx).iter().any(|c| c.address() == *addr)
    }

    fn has_condition(&self, ctx: &Context, cond: &Condition) -> bool {
        self.conditions(ctx).contains(cond)
    }
}

/// Reads the conditions recorded in the context under one namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextAuth {
    namespace: &'static str,
}

impl ContextAuth {
    pub const fn new(namespace: &'static str) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &'static str {
        self.namespace
    }
}

impl Authenticator for ContextAuth {
    fn conditions(&self, ctx: &Context) -> Vec<Condition> {
        ctx.conditions(self.namespace).to_vec()
    }
}

/// Union of several authenticators. Conditions are returned in the order
/// of the underlying authenticators, without duplicates.
#[derive(Default)]
pub struct ChainAuth {
    auths: Vec<Box<dyn Authenticator>>,
}

impl ChainAuth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, auth: impl Authenticator + 'static) -> Self {
        self.auths.push(Box::new(auth));
        self
    }
}

impl Authenticator for ChainAuth {
    fn conditions(&self, ctx: &Context) -> Vec<Condition> {
        let mut out: Vec<Condition> = Vec::new();
        for auth in &self.auths {
            for cond in auth.conditions(ctx) {
                if !out.contains(&cond) {
                    out.push(cond);
                }
            }
        }
        out
    }

    fn has_address(&self, ctx: &Context, addr: &Address) -> bool {
        self.auths.iter().any(|a| a.has_address(ctx, addr))
    }
}

/// The primary condition of a transaction: the first one offered by
/// `auth`. Used as the implicit fee payer.
pub fn main_signer(ctx: &Context, auth: &dyn Authenticator) -> Option<Condition> {
    auth.conditions(ctx).into_iter().next()
}
