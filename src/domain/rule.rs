use crate::domain::ids::{Code, RegionId};
use crate::errors::CoreError;
use serde::{Deserialize, Serialize};

/// Comparator a `Condition` leaf applies to a user's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparator {
    Eq,
    Neq,
}

/// Period spec for a strategy leaf: either a fiscal-year window or a
/// rolling lookback window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Period {
    Year {
        years: i32,
        #[serde(rename = "offsetYears")]
        offset_years: i32,
    },
    Rolling {
        #[serde(rename = "rollingDays")]
        rolling_days: i64,
        #[serde(rename = "rollingMonths")]
        rolling_months: i64,
        #[serde(rename = "rollingYears")]
        rolling_years: i64,
    },
}

impl Period {
    /// Structural validation run at rule-ingest time (§4.3 edge cases):
    /// a rolling period with every component zero is rejected here, not
    /// at evaluation time.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Period::Rolling {
            rolling_days,
            rolling_months,
            rolling_years,
        } = self
        {
            if *rolling_days == 0 && *rolling_months == 0 && *rolling_years == 0 {
                return Err(CoreError::validation(
                    "rolling period must have at least one nonzero component",
                ));
            }
        }
        Ok(())
    }
}

/// A day-count leaf: `kind` selects a registered strategy (§4.2); `props`
/// is strategy-specific and decoded lazily by that strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyNode {
    pub kind: String,
    pub period: Period,
    pub props: serde_json::Value,
}

/// A user-answer leaf.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionNode {
    #[serde(rename = "conditionId")]
    pub condition_id: Code,
    pub comparator: Comparator,
    pub expected: serde_json::Value,
}

/// The recursive rule tree. A closed tagged sum so the evaluator's match is
/// exhaustive at compile time — no dynamic type discrimination, no node-id
/// back-references (trees are inline-serialized and acyclic by
/// construction).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuleNode {
    CompositeAnd { children: Vec<RuleNode> },
    CompositeAny { children: Vec<RuleNode> },
    Strategy(StrategyNode),
    Condition(ConditionNode),
}

impl RuleNode {
    /// Structural validation run at rule ingest (§3 Invariant 5 and
    /// §4.3): composite nodes need ≥2 children, periods must be
    /// well-formed. Recurses into every descendant.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            RuleNode::CompositeAnd { children } | RuleNode::CompositeAny { children } => {
                if children.len() < 2 {
                    return Err(CoreError::validation(
                        "composite nodes require at least 2 children",
                    ));
                }
                for child in children {
                    child.validate()?;
                }
                Ok(())
            }
            RuleNode::Strategy(node) => node.period.validate(),
            RuleNode::Condition(_) => Ok(()),
        }
    }
}

/// A named root of a rule tree, scoped to a region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: Code,
    pub region_id: RegionId,
    pub name: String,
    pub description: String,
    pub node: RuleNode,
}

impl Rule {
    pub fn validate(&self) -> Result<(), CoreError> {
        self.node.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leaf_condition() -> RuleNode {
        RuleNode::Condition(ConditionNode {
            condition_id: Code::parse("MAINTAINS_ABODE").unwrap(),
            comparator: Comparator::Eq,
            expected: json!(false),
        })
    }

    #[test]
    fn composite_with_fewer_than_two_children_is_rejected() {
        let node = RuleNode::CompositeAnd {
            children: vec![leaf_condition()],
        };
        assert!(node.validate().is_err());
    }

    #[test]
    fn composite_with_two_children_is_accepted() {
        let node = RuleNode::CompositeAnd {
            children: vec![leaf_condition(), leaf_condition()],
        };
        assert!(node.validate().is_ok());
    }

    #[test]
    fn all_zero_rolling_period_is_rejected() {
        let period = Period::Rolling {
            rolling_days: 0,
            rolling_months: 0,
            rolling_years: 0,
        };
        assert!(period.validate().is_err());
    }

    #[test]
    fn rule_json_round_trips() {
        let rule = Rule {
            id: Code::parse("183-DAY").unwrap(),
            region_id: RegionId::parse("JE").unwrap(),
            name: "183 day test".to_string(),
            description: "".to_string(),
            node: RuleNode::Strategy(StrategyNode {
                kind: "aggregate".to_string(),
                period: Period::Year {
                    years: 1,
                    offset_years: 0,
                },
                props: json!({"threshold": 183}),
            }),
        };

        let encoded = serde_json::to_string(&rule).unwrap();
        let decoded: Rule = serde_json::from_str(&encoded).unwrap();
        let re_encoded = serde_json::to_string(&decoded).unwrap();
        assert_eq!(encoded, re_encoded);
    }
}
