use crate::domain::{RegionEvaluation, RegionId, RuleEvaluation, UserId};
use crate::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS evaluations (
    user_id BIGINT NOT NULL,
    region_id TEXT NOT NULL,
    passed BOOLEAN NOT NULL,
    details JSONB NOT NULL,
    point_in_time TIMESTAMPTZ NOT NULL,
    evaluated_at TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (user_id, region_id)
)"#;

/// The evaluation cache (§4.4): entries are opaque to the reader, no TTL.
/// Freshness comes entirely from deletion on the mutations listed in the
/// invalidation table, never from a read-time freshness check.
#[async_trait]
pub trait EvaluationRepository: Send + Sync {
    async fn get(&self, user_id: UserId, region_id: &RegionId) -> CoreResult<Option<RegionEvaluation>>;
    async fn upsert(&self, evaluation: &RegionEvaluation) -> CoreResult<()>;
    async fn delete(&self, user_id: UserId, region_id: &RegionId) -> CoreResult<()>;
    async fn delete_by_region(&self, region_id: &RegionId) -> CoreResult<()>;
}

pub struct PostgresEvaluationRepository {
    pool: PgPool,
}

impl PostgresEvaluationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_evaluation(row: &sqlx::postgres::PgRow) -> Result<RegionEvaluation, sqlx::Error> {
    let region_id: String = row.try_get("region_id")?;
    let details: Json<Vec<RuleEvaluation>> = row.try_get("details")?;

    Ok(RegionEvaluation {
        user_id: UserId(row.try_get("user_id")?),
        region_id: RegionId::parse(&region_id).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        passed: row.try_get("passed")?,
        nodes: details.0,
        point_in_time: row.try_get("point_in_time")?,
        evaluated_at: row.try_get("evaluated_at")?,
    })
}

#[async_trait]
impl EvaluationRepository for PostgresEvaluationRepository {
    async fn get(&self, user_id: UserId, region_id: &RegionId) -> CoreResult<Option<RegionEvaluation>> {
        let row = sqlx::query("SELECT * FROM evaluations WHERE user_id = $1 AND region_id = $2")
            .bind(user_id.0)
            .bind(region_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        row.as_ref()
            .map(|r| row_to_evaluation(r).map_err(|e| CoreError::Internal(e.into())))
            .transpose()
    }

    async fn upsert(&self, evaluation: &RegionEvaluation) -> CoreResult<()> {
        sqlx::query(
            r#"INSERT INTO evaluations (user_id, region_id, passed, details, point_in_time, evaluated_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (user_id, region_id) DO UPDATE SET
                 passed = $3, details = $4, point_in_time = $5, evaluated_at = $6"#,
        )
        .bind(evaluation.user_id.0)
        .bind(evaluation.region_id.as_str())
        .bind(evaluation.passed)
        .bind(Json(&evaluation.nodes))
        .bind(evaluation.point_in_time)
        .bind(evaluation.evaluated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }

    async fn delete(&self, user_id: UserId, region_id: &RegionId) -> CoreResult<()> {
        sqlx::query("DELETE FROM evaluations WHERE user_id = $1 AND region_id = $2")
            .bind(user_id.0)
            .bind(region_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }

    async fn delete_by_region(&self, region_id: &RegionId) -> CoreResult<()> {
        sqlx::query("DELETE FROM evaluations WHERE region_id = $1")
            .bind(region_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }
}
