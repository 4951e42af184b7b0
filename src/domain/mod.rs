//! Core data model: identifiers, catalog entities (region/rule/condition),
//! per-user entities (presence/answer), and the evaluation result types.
//! This module has no I/O; persistence lives in `crate::repository`.

pub mod condition;
pub mod evaluation;
pub mod ids;
pub mod presence;
pub mod region;
pub mod rule;

pub use condition::{Answer, ConditionDef, ConditionType};
pub use evaluation::{
    AnswersByConditionId, CompositeKind, EvaluateOpts, EvaluationComponent, EvaluationContext,
    EvaluationStatus, RegionEvaluation, RuleEvaluation,
};
pub use ids::{Code, RegionId, UserId};
pub use presence::{DateRange, Presence};
pub use region::{LatLng, Region, RegionType};
pub use rule::{Comparator, ConditionNode, Period, Rule, RuleNode, StrategyNode};
