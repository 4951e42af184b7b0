use super::{Strategy, StrategyEvaluation};
use crate::errors::CoreError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct Props {
    threshold: i64,
}

/// Longest run of consecutive calendar days present, compared against a
/// threshold. `count` reports the longest run found, not the total day
/// count — that distinguishes it from `aggregate`.
pub struct ConsecutiveStrategy;

impl Strategy for ConsecutiveStrategy {
    fn evaluate(
        &self,
        props: &serde_json::Value,
        presence_days: &HashSet<NaiveDate>,
    ) -> Result<StrategyEvaluation, CoreError> {
        let props: Props = serde_json::from_value(props.clone())
            .map_err(|e| CoreError::validation(format!("invalid consecutive props: {e}")))?;

        let mut sorted: Vec<NaiveDate> = presence_days.iter().copied().collect();
        sorted.sort();

        let mut longest_run = 0i64;
        let mut current_run = 0i64;
        let mut previous: Option<NaiveDate> = None;

        for date in sorted {
            current_run = match previous {
                Some(prev) if prev.succ_opt() == Some(date) => current_run + 1,
                _ => 1,
            };
            longest_run = longest_run.max(current_run);
            previous = Some(date);
        }

        let mut metadata = serde_json::Map::new();
        metadata.insert("longestRun".to_string(), serde_json::json!(longest_run));

        Ok(StrategyEvaluation {
            passed: longest_run >= props.threshold,
            count: longest_run,
            remaining: (props.threshold - longest_run).max(0),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn finds_longest_run_ignoring_gaps() {
        let mut days = HashSet::new();
        for i in 0..5 {
            days.insert(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(i));
        }
        for i in 0..20 {
            days.insert(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap() + chrono::Duration::days(i));
        }
        let result = ConsecutiveStrategy
            .evaluate(&json!({"threshold": 15}), &days)
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.count, 20);
    }

    #[test]
    fn empty_presence_set_has_zero_run() {
        let result = ConsecutiveStrategy
            .evaluate(&json!({"threshold": 1}), &HashSet::new())
            .unwrap();
        assert!(!result.passed);
        assert_eq!(result.count, 0);
    }
}
