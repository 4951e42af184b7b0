use crate::domain::condition::Answer;
use crate::domain::ids::{Code, RegionId, UserId};
use crate::domain::presence::Presence;
use crate::domain::region::Region;
use crate::domain::rule::{Comparator, Rule};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keyed by condition id for O(1) lookup during rule evaluation.
pub type AnswersByConditionId = HashMap<Code, Answer>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationStatus {
    Evaluated,
    Unanswered,
    Error,
}

/// One node's evaluation result. Every variant carries at least
/// `{status, passed}`; composite/strategy/condition each add their own
/// fields, mirroring the shape the original's `EvaluationComponent`
/// interface imposes via `IsPassed()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EvaluationComponent {
    Composite {
        #[serde(rename = "nodeType")]
        node_type: CompositeKind,
        status: EvaluationStatus,
        passed: bool,
        components: Vec<EvaluationComponent>,
    },
    Strategy {
        strategy: String,
        status: EvaluationStatus,
        passed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        count: i64,
        remaining: i64,
        #[serde(skip_serializing_if = "serde_json::Map::is_empty", default)]
        metadata: serde_json::Map<String, serde_json::Value>,
    },
    Condition {
        #[serde(rename = "conditionId")]
        condition_id: Code,
        comparator: Comparator,
        expected: serde_json::Value,
        #[serde(skip_serializing_if = "Option::is_none")]
        actual: Option<serde_json::Value>,
        status: EvaluationStatus,
        passed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum CompositeKind {
    And,
    Any,
}

impl EvaluationComponent {
    pub fn is_passed(&self) -> bool {
        match self {
            EvaluationComponent::Composite { passed, .. } => *passed,
            EvaluationComponent::Strategy { passed, .. } => *passed,
            EvaluationComponent::Condition { passed, .. } => *passed,
        }
    }

    pub fn status(&self) -> EvaluationStatus {
        match self {
            EvaluationComponent::Composite { status, .. } => *status,
            EvaluationComponent::Strategy { status, .. } => *status,
            EvaluationComponent::Condition { status, .. } => *status,
        }
    }
}

/// A named root's evaluation result, paired with the rule it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEvaluation {
    #[serde(rename = "ruleId")]
    pub rule_id: Code,
    #[serde(flatten)]
    pub component: EvaluationComponent,
}

/// The cached output, keyed `(userId, regionId)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionEvaluation {
    pub user_id: UserId,
    pub region_id: RegionId,
    pub passed: bool,
    pub nodes: Vec<RuleEvaluation>,
    pub point_in_time: DateTime<Utc>,
    pub evaluated_at: DateTime<Utc>,
}

/// Immutable per-evaluation snapshot. Consistent within a single
/// evaluation: all four reads (region, rules, answers, presences) target
/// the same logical database instant (§4.4).
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    pub at: DateTime<Utc>,
    pub region: Region,
    pub presences: Vec<Presence>,
    pub rules: Vec<Rule>,
    pub answers_by_condition_id: AnswersByConditionId,
}

/// Flags controlling one `evaluate_region` call, threaded through both the
/// synchronous HTTP read path and the async worker.
#[derive(Debug, Clone, Copy)]
pub struct EvaluateOpts {
    pub point_in_time: DateTime<Utc>,
    pub recompute: bool,
    pub cache: bool,
    pub publish: bool,
}

impl Default for EvaluateOpts {
    fn default() -> Self {
        Self {
            point_in_time: Utc::now(),
            recompute: false,
            cache: true,
            publish: true,
        }
    }
}
