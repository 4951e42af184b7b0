use crate::domain::{Code, RegionId, Rule, RuleNode};
use crate::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS rules (
    id TEXT PRIMARY KEY,
    region_id TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    node JSONB NOT NULL
)"#;

/// Process-wide catalog data (§3 Ownership). `node` stores the whole
/// recursive tree as one JSONB column — trees are inline-serialized, so
/// there is no separate child-row table to join against.
#[async_trait]
pub trait RuleRepository: Send + Sync {
    async fn get(&self, id: &Code) -> CoreResult<Rule>;
    async fn list_for_region(&self, region_id: &RegionId) -> CoreResult<Vec<Rule>>;
    async fn upsert(&self, rule: &Rule) -> CoreResult<()>;
}

pub struct PostgresRuleRepository {
    pool: PgPool,
}

impl PostgresRuleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_rule(row: &sqlx::postgres::PgRow) -> Result<Rule, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let region_id: String = row.try_get("region_id")?;
    let node: Json<RuleNode> = row.try_get("node")?;

    Ok(Rule {
        id: Code::parse(&id).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        region_id: RegionId::parse(&region_id).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        node: node.0,
    })
}

#[async_trait]
impl RuleRepository for PostgresRuleRepository {
    async fn get(&self, id: &Code) -> CoreResult<Rule> {
        let row = sqlx::query("SELECT * FROM rules WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?
            .ok_or_else(|| CoreError::not_found(format!("rule {id} not found")))?;

        row_to_rule(&row).map_err(|e| CoreError::Internal(e.into()))
    }

    async fn list_for_region(&self, region_id: &RegionId) -> CoreResult<Vec<Rule>> {
        let rows = sqlx::query("SELECT * FROM rules WHERE region_id = $1")
            .bind(region_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter()
            .map(|r| row_to_rule(r).map_err(|e| CoreError::Internal(e.into())))
            .collect()
    }

    async fn upsert(&self, rule: &Rule) -> CoreResult<()> {
        rule.validate()?;

        sqlx::query(
            r#"INSERT INTO rules (id, region_id, name, description, node)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT (id) DO UPDATE SET
                 region_id = $2, name = $3, description = $4, node = $5"#,
        )
        .bind(rule.id.as_str())
        .bind(rule.region_id.as_str())
        .bind(&rule.name)
        .bind(&rule.description)
        .bind(Json(&rule.node))
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }
}
