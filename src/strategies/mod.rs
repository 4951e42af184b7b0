//! Day-count strategy registry (C2). Each strategy is a pure function of
//! a window of presence days plus a JSON props blob; the registry maps a
//! rule's `kind` string to the evaluator that decodes and runs it.
//!
//! Strategies are registered once at process startup and never mutated
//! afterward, so lookups need no locking. Unlike the teacher's condition
//! evaluators (which `await` external price feeds), a strategy here is a
//! deterministic calculation over dates already in memory, so the trait
//! stays synchronous rather than reaching for `async_trait` out of habit.

mod aggregate;
mod average;
mod consecutive;
mod weighted;

pub use aggregate::AggregateStrategy;
pub use average::AverageStrategy;
pub use consecutive::ConsecutiveStrategy;
pub use weighted::WeightedStrategy;

use crate::errors::CoreError;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

/// Result of one strategy leaf's evaluation, independent of the rule tree
/// shape it sits in.
#[derive(Debug, Clone)]
pub struct StrategyEvaluation {
    pub passed: bool,
    pub count: i64,
    pub remaining: i64,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// A registered day-count strategy. `props` is the rule's strategy-node
/// props blob, decoded here rather than upstream since each strategy owns
/// its own config shape.
pub trait Strategy: Send + Sync {
    fn evaluate(
        &self,
        props: &serde_json::Value,
        presence_days: &HashSet<NaiveDate>,
    ) -> Result<StrategyEvaluation, CoreError>;
}

/// Append-only strategy lookup table, built once at startup.
pub struct StrategyRegistry {
    strategies: HashMap<String, Box<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            strategies: HashMap::new(),
        };
        registry.register("aggregate", Box::new(AggregateStrategy));
        registry.register("average", Box::new(AverageStrategy));
        registry.register("weighted", Box::new(WeightedStrategy));
        registry.register("consecutive", Box::new(ConsecutiveStrategy));
        registry
    }

    /// Register a strategy under `kind`. Panics on a duplicate kind: this
    /// only ever runs during startup wiring, where a collision is a
    /// programming error, not a runtime condition to recover from.
    pub fn register(&mut self, kind: &str, strategy: Box<dyn Strategy>) {
        if self.strategies.contains_key(kind) {
            panic!("strategy already registered for kind {kind}");
        }
        self.strategies.insert(kind.to_string(), strategy);
    }

    /// Look up a strategy by kind. A miss here is a data problem (an
    /// unknown or misspelled kind in a stored rule), not a startup
    /// problem, so it returns `None` rather than panicking — the caller
    /// turns it into an `Error`-status evaluation node.
    pub fn get(&self, kind: &str) -> Option<&dyn Strategy> {
        self.strategies.get(kind).map(|s| s.as_ref())
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_kind_is_none_not_a_panic() {
        let registry = StrategyRegistry::new();
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut registry = StrategyRegistry::new();
        registry.register("aggregate", Box::new(AggregateStrategy));
    }
}
