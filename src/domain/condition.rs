use crate::domain::ids::{Code, RegionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    Boolean,
    Integer,
    String,
    Select,
    MultiSelect,
}

/// A prompt presented to the user. The comparison against the answer lives
/// on the `Condition` rule node, not here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionDef {
    pub id: Code,
    pub region_id: RegionId,
    pub prompt: String,
    pub condition_type: ConditionType,
}

/// A user's answer to a `ConditionDef`. Unique on `(userId, conditionId)`;
/// `region_id` is denormalized from the condition purely to scope cache
/// invalidation without a join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub user_id: UserId,
    pub condition_id: Code,
    pub region_id: RegionId,
    pub value: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
