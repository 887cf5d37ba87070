//! Ordered stage composition.
//!
//! The stage order is data: a `Vec` of boxed decorators built once at
//! startup. Calling a [`Stack`] walks that list front to back, each stage
//! receiving a [`Next`] view over the remaining stages and the terminal
//! handler.

use super::handler::{CheckResult, Decorator, DeliverResult, Handler};
use crate::context::Context;
use crate::errors::Result;
use crate::store::KvStore;

/// Builder for an ordered list of stages.
pub struct Decorators<T> {
    stages: Vec<Box<dyn Decorator<T>>>,
}

impl<T> Default for Decorators<T> {
    fn default() -> Self {
        Self { stages: Vec::new() }
    }
}

impl<T> Decorators<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage. Stages run in the order they were chained.
    pub fn chain(mut self, stage: impl Decorator<T> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Terminates the chain with `handler`.
    pub fn with_handler(self, handler: impl Handler<T> + 'static) -> Stack<T> {
        Stack {
            stages: self.stages,
            handler: Box::new(handler),
        }
    }
}

/// A complete pipeline: stages followed by a terminal handler.
pub struct Stack<T> {
    stages: Vec<Box<dyn Decorator<T>>>,
    handler: Box<dyn Handler<T>>,
}

impl<T> Stack<T> {
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    fn next(&self) -> Next<'_, T> {
        Next {
            stages: &self.stages,
            handler: self.handler.as_ref(),
        }
    }
}

impl<T> Handler<T> for Stack<T> {
    fn check(&self, ctx: &Context, store: &mut dyn KvStore, tx: &T) -> Result<CheckResult> {
        self.next().check(ctx, store, tx)
    }

    fn deliver(&self, ctx: &Context, store: &mut dyn KvStore, tx: &T) -> Result<DeliverResult> {
        self.next().deliver(ctx, store, tx)
    }
}

/// The continuation handed to a stage: the stages after it plus the
/// terminal handler.
pub struct Next<'a, T> {
    stages: &'a [Box<dyn Decorator<T>>],
    handler: &'a dyn Handler<T>,
}

impl<T> Handler<T> for Next<'_, T> {
    fn check(&self, ctx: &Context, store: &mut dyn KvStore, tx: &T) -> Result<CheckResult> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    handler: self.handler,
                };
                stage.check(ctx, store, tx, &next)
            }
            None => self.handler.check(ctx, store, tx),
        }
    }

    fn deliver(&self, ctx: &Context, store: &mut dyn KvStore, tx: &T) -> Result<DeliverResult> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    handler: self.handler,
                };
                stage.deliver(ctx, store, tx, &next)
            }
            None => self.handler.deliver(ctx, store, tx),
        }
    }
}
