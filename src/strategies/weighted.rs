use super::{Strategy, StrategyEvaluation};
use crate::errors::CoreError;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Deserialize)]
struct Props {
    threshold: f64,
    /// Weight per year offset from the latest year present: index 0 is
    /// the most recent year, index 1 the year before that, and so on.
    weights: Vec<f64>,
}

/// Weighted day-count across a range of years, e.g. a "look-back" test
/// that counts the current year at full weight and prior years at a
/// discount.
pub struct WeightedStrategy;

impl Strategy for WeightedStrategy {
    fn evaluate(
        &self,
        props: &serde_json::Value,
        presence_days: &HashSet<NaiveDate>,
    ) -> Result<StrategyEvaluation, CoreError> {
        let props: Props = serde_json::from_value(props.clone())
            .map_err(|e| CoreError::validation(format!("invalid weighted props: {e}")))?;

        let base_year = presence_days.iter().map(|d| d.year()).max().unwrap_or(0);

        let mut days_by_offset: HashMap<i32, i64> =
            (0..props.weights.len() as i32).map(|offset| (offset, 0)).collect();

        for date in presence_days {
            let offset = base_year - date.year();
            if let Some(count) = days_by_offset.get_mut(&offset) {
                *count += 1;
            }
        }

        let mut weighted_total = 0.0f64;
        for (offset, weight) in props.weights.iter().enumerate() {
            let count = days_by_offset.get(&(offset as i32)).copied().unwrap_or(0);
            weighted_total += count as f64 * weight;
        }

        let mut days_by_year = serde_json::Map::new();
        for (offset, count) in &days_by_offset {
            days_by_year.insert((base_year - offset).to_string(), serde_json::json!(count));
        }

        let mut metadata = serde_json::Map::new();
        metadata.insert("baseYear".to_string(), serde_json::json!(base_year));
        metadata.insert("daysByYear".to_string(), serde_json::Value::Object(days_by_year));
        metadata.insert("weightedTotal".to_string(), serde_json::json!(weighted_total));

        let remaining = (props.threshold - weighted_total).ceil().max(0.0) as i64;

        Ok(StrategyEvaluation {
            passed: weighted_total >= props.threshold,
            count: weighted_total as i64,
            remaining,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn weights_recent_year_at_full_strength() {
        let mut days = HashSet::new();
        for i in 0..100 {
            days.insert(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Duration::days(i));
        }
        let result = WeightedStrategy
            .evaluate(&json!({"threshold": 90.0, "weights": [1.0, 0.5, 0.25]}), &days)
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.metadata.get("baseYear").unwrap(), &json!(2025));
    }

    #[test]
    fn offsets_outside_weights_are_ignored() {
        let mut days = HashSet::new();
        days.insert(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        days.insert(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        let result = WeightedStrategy
            .evaluate(&json!({"threshold": 1.0, "weights": [1.0]}), &days)
            .unwrap();
        assert_eq!(result.count, 1);
    }
}
