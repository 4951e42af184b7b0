use crate::domain::{Answer, Code, RegionId, UserId};
use crate::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS answers (
    user_id BIGINT NOT NULL,
    condition_id TEXT NOT NULL,
    region_id TEXT NOT NULL,
    value JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (user_id, condition_id)
)"#;

#[async_trait]
pub trait AnswerRepository: Send + Sync {
    async fn list_for_user_and_region(
        &self,
        user_id: UserId,
        region_id: &RegionId,
    ) -> CoreResult<Vec<Answer>>;

    async fn upsert(&self, answer: &Answer) -> CoreResult<()>;

    async fn delete(&self, user_id: UserId, condition_id: &Code) -> CoreResult<()>;
}

pub struct PostgresAnswerRepository {
    pool: PgPool,
}

impl PostgresAnswerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_answer(row: &sqlx::postgres::PgRow) -> Result<Answer, sqlx::Error> {
    let condition_id: String = row.try_get("condition_id")?;
    let region_id: String = row.try_get("region_id")?;
    Ok(Answer {
        user_id: UserId(row.try_get("user_id")?),
        condition_id: Code::parse(&condition_id).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        region_id: RegionId::parse(&region_id).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        value: row.try_get("value")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl AnswerRepository for PostgresAnswerRepository {
    async fn list_for_user_and_region(
        &self,
        user_id: UserId,
        region_id: &RegionId,
    ) -> CoreResult<Vec<Answer>> {
        let rows = sqlx::query("SELECT * FROM answers WHERE user_id = $1 AND region_id = $2")
            .bind(user_id.0)
            .bind(region_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter()
            .map(|r| row_to_answer(r).map_err(|e| CoreError::Internal(e.into())))
            .collect()
    }

    async fn upsert(&self, answer: &Answer) -> CoreResult<()> {
        sqlx::query(
            r#"INSERT INTO answers (user_id, condition_id, region_id, value, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (user_id, condition_id) DO UPDATE SET
                 region_id = $3, value = $4, updated_at = $6"#,
        )
        .bind(answer.user_id.0)
        .bind(answer.condition_id.as_str())
        .bind(answer.region_id.as_str())
        .bind(&answer.value)
        .bind(answer.created_at)
        .bind(answer.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }

    async fn delete(&self, user_id: UserId, condition_id: &Code) -> CoreResult<()> {
        sqlx::query("DELETE FROM answers WHERE user_id = $1 AND condition_id = $2")
            .bind(user_id.0)
            .bind(condition_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }
}
