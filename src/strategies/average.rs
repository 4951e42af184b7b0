use super::{Strategy, StrategyEvaluation};
use crate::errors::CoreError;
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize)]
struct Props {
    threshold: i64,
}

/// Same day-count threshold as `aggregate`, but also reports the
/// count-to-threshold ratio in metadata for callers that display an
/// average-over-period figure.
pub struct AverageStrategy;

impl Strategy for AverageStrategy {
    fn evaluate(
        &self,
        props: &serde_json::Value,
        presence_days: &HashSet<NaiveDate>,
    ) -> Result<StrategyEvaluation, CoreError> {
        let props: Props = serde_json::from_value(props.clone())
            .map_err(|e| CoreError::validation(format!("invalid average props: {e}")))?;

        let count = presence_days.len() as i64;
        let ratio = if props.threshold != 0 {
            count as f64 / props.threshold as f64
        } else {
            0.0
        };

        let mut metadata = serde_json::Map::new();
        metadata.insert("ratio".to_string(), serde_json::json!(ratio));

        Ok(StrategyEvaluation {
            passed: count >= props.threshold,
            count,
            remaining: (props.threshold - count).max(0),
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reports_ratio_in_metadata() {
        let days: HashSet<NaiveDate> = (0..90)
            .map(|i| NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(i))
            .collect();
        let result = AverageStrategy.evaluate(&json!({"threshold": 180}), &days).unwrap();
        assert!(!result.passed);
        assert_eq!(result.metadata.get("ratio").unwrap(), &json!(0.5));
    }
}
