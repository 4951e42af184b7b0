use crate::domain::{Code, ConditionDef, ConditionType, RegionId};
use crate::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conditions (
    id TEXT PRIMARY KEY,
    region_id TEXT NOT NULL,
    prompt TEXT NOT NULL,
    condition_type TEXT NOT NULL
)"#;

#[async_trait]
pub trait ConditionRepository: Send + Sync {
    async fn get(&self, id: &Code) -> CoreResult<ConditionDef>;
    async fn list_for_region(&self, region_id: &RegionId) -> CoreResult<Vec<ConditionDef>>;
    async fn upsert(&self, condition: &ConditionDef) -> CoreResult<()>;
}

pub struct PostgresConditionRepository {
    pool: PgPool,
}

impl PostgresConditionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn condition_type_str(t: ConditionType) -> &'static str {
    match t {
        ConditionType::Boolean => "boolean",
        ConditionType::Integer => "integer",
        ConditionType::String => "string",
        ConditionType::Select => "select",
        ConditionType::MultiSelect => "multi_select",
    }
}

fn row_to_condition(row: &sqlx::postgres::PgRow) -> Result<ConditionDef, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let region_id: String = row.try_get("region_id")?;
    let condition_type: String = row.try_get("condition_type")?;
    let condition_type = match condition_type.as_str() {
        "boolean" => ConditionType::Boolean,
        "integer" => ConditionType::Integer,
        "string" => ConditionType::String,
        "select" => ConditionType::Select,
        "multi_select" => ConditionType::MultiSelect,
        other => return Err(sqlx::Error::Decode(format!("unknown condition_type {other}").into())),
    };

    Ok(ConditionDef {
        id: Code::parse(&id).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        region_id: RegionId::parse(&region_id).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        prompt: row.try_get("prompt")?,
        condition_type,
    })
}

#[async_trait]
impl ConditionRepository for PostgresConditionRepository {
    async fn get(&self, id: &Code) -> CoreResult<ConditionDef> {
        let row = sqlx::query("SELECT * FROM conditions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?
            .ok_or_else(|| CoreError::not_found(format!("condition {id} not found")))?;

        row_to_condition(&row).map_err(|e| CoreError::Internal(e.into()))
    }

    async fn list_for_region(&self, region_id: &RegionId) -> CoreResult<Vec<ConditionDef>> {
        let rows = sqlx::query("SELECT * FROM conditions WHERE region_id = $1")
            .bind(region_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter()
            .map(|r| row_to_condition(r).map_err(|e| CoreError::Internal(e.into())))
            .collect()
    }

    async fn upsert(&self, condition: &ConditionDef) -> CoreResult<()> {
        sqlx::query(
            r#"INSERT INTO conditions (id, region_id, prompt, condition_type)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (id) DO UPDATE SET
                 region_id = $2, prompt = $3, condition_type = $4"#,
        )
        .bind(condition.id.as_str())
        .bind(condition.region_id.as_str())
        .bind(&condition.prompt)
        .bind(condition_type_str(condition.condition_type))
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }
}
