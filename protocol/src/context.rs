//! Per-call execution context.
//!
//! A [`Context`] carries the block-level facts a stage may depend on and
//! the conditions authenticated so far. Stages never mutate the context
//! they were given; an authenticating stage derives a new one with
//! [`Context::with_conditions`] and hands that to its continuation, so a
//! condition is only visible to stages that run after the one that
//! produced it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::auth::Condition;

/// Block-level data and authenticated conditions for one pipeline call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    chain_id: String,
    height: u64,
    block_time: DateTime<Utc>,
    /// Conditions keyed by the namespace of the stage that proved them.
    conditions: BTreeMap<&'static str, Vec<Condition>>,
}

impl Context {
    pub fn new(chain_id: impl Into<String>, height: u64, block_time: DateTime<Utc>) -> Self {
        Self {
            chain_id: chain_id.into(),
            height,
            block_time,
            conditions: BTreeMap::new(),
        }
    }

    pub fn chain_id(&self) -> &str {
        &self.chain_id
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    pub fn block_time(&self) -> DateTime<Utc> {
        self.block_time
    }

    /// Returns a copy of this context with `conditions` appended under
    /// `namespace`. Conditions already present are not duplicated.
    pub fn with_conditions(&self, namespace: &'static str, conditions: Vec<Condition>) -> Context {
        let mut next = self.clone();
        let entry = next.conditions.entry(namespace).or_default();
        for cond in conditions {
            if !entry.contains(&cond) {
                entry.push(cond);
            }
        }
        next
    }

    /// Conditions recorded under `namespace`, in the order they were added.
    pub fn conditions(&self, namespace: &str) -> &[Condition] {
        self.conditions
            .get(namespace)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every recorded condition, grouped by namespace in name order.
    pub fn all_conditions(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.values().flatten()
    }

    pub fn has_condition(&self, cond: &Condition) -> bool {
        self.all_conditions().any(|c| c == cond)
    }
}
