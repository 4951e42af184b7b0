//! Persistence layer. One file per entity, each exporting a `SCHEMA`
//! constant and a `{Entity}Repository` trait plus its `Postgres*`
//! implementation — the same decomposition the teacher uses for its
//! database layer, generalized from a single `rusqlite::Connection` to an
//! async `sqlx::PgPool`.

pub mod answer;
pub mod condition;
pub mod device;
pub mod evaluation;
pub mod pool;
pub mod presence;
pub mod region;
pub mod rule;
pub mod user;

pub use answer::{AnswerRepository, PostgresAnswerRepository};
pub use condition::{ConditionRepository, PostgresConditionRepository};
pub use device::{Device, DeviceRepository, PostgresDeviceRepository};
pub use evaluation::{EvaluationRepository, PostgresEvaluationRepository};
pub use presence::{PostgresPresenceRepository, PresenceRepository};
pub use region::{PostgresRegionRepository, RegionRepository};
pub use rule::{PostgresRuleRepository, RuleRepository};
pub use user::{PostgresUserRepository, User, UserRepository};

use sqlx::PgPool;
use std::sync::Arc;

/// Bundles one instance of every repository behind a trait object, so the
/// context builder and the services above it depend on trait objects
/// rather than concrete Postgres types.
#[derive(Clone)]
pub struct Repositories {
    pub region: Arc<dyn RegionRepository>,
    pub rule: Arc<dyn RuleRepository>,
    pub condition: Arc<dyn ConditionRepository>,
    pub answer: Arc<dyn AnswerRepository>,
    pub presence: Arc<dyn PresenceRepository>,
    pub evaluation: Arc<dyn EvaluationRepository>,
    pub device: Arc<dyn DeviceRepository>,
    pub user: Arc<dyn UserRepository>,
}

impl Repositories {
    pub fn new_postgres(pool: PgPool) -> Self {
        Self {
            region: Arc::new(PostgresRegionRepository::new(pool.clone())),
            rule: Arc::new(PostgresRuleRepository::new(pool.clone())),
            condition: Arc::new(PostgresConditionRepository::new(pool.clone())),
            answer: Arc::new(PostgresAnswerRepository::new(pool.clone())),
            presence: Arc::new(PostgresPresenceRepository::new(pool.clone())),
            evaluation: Arc::new(PostgresEvaluationRepository::new(pool.clone())),
            device: Arc::new(PostgresDeviceRepository::new(pool.clone())),
            user: Arc::new(PostgresUserRepository::new(pool)),
        }
    }
}
