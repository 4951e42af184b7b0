use super::{Strategy, StrategyEvaluation};
use crate::errors::CoreError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct Props {
    threshold: i64,
}

/// Plain day-count threshold within the strategy's period window.
pub struct AggregateStrategy;

impl Strategy for AggregateStrategy {
    fn evaluate(
        &self,
        props: &serde_json::Value,
        presence_days: &HashSet<NaiveDate>,
    ) -> Result<StrategyEvaluation, CoreError> {
        let props: Props = serde_json::from_value(props.clone())
            .map_err(|e| CoreError::validation(format!("invalid aggregate props: {e}")))?;

        let count = presence_days.len() as i64;
        let remaining = (props.threshold - count).max(0);

        Ok(StrategyEvaluation {
            passed: count >= props.threshold,
            count,
            remaining,
            metadata: serde_json::Map::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn days(n: i64) -> HashSet<NaiveDate> {
        (0..n)
            .map(|i| NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(i))
            .collect()
    }

    #[test]
    fn passes_when_count_meets_threshold() {
        let result = AggregateStrategy
            .evaluate(&json!({"threshold": 183}), &days(183))
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.count, 183);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn reports_remaining_when_short() {
        let result = AggregateStrategy
            .evaluate(&json!({"threshold": 183}), &days(100))
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.remaining, 83);
    }
}
