use crate::domain::UserId;
use crate::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    external_id TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)"#;

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: UserId,
    pub external_id: String,
    pub created_at: DateTime<Utc>,
}

/// Out of scope for deep logic (§1 Non-goals) — authentication/identity
/// is assumed to sit in front of this service; this is a thin lookup
/// table mapping an external identity to the internal `UserId` the rest
/// of the core operates on.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, id: UserId) -> CoreResult<User>;
    async fn get_by_external_id(&self, external_id: &str) -> CoreResult<User>;
    async fn upsert(&self, external_id: &str) -> CoreResult<User>;
}

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_user(row: &sqlx::postgres::PgRow) -> Result<User, sqlx::Error> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        external_id: row.try_get("external_id")?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get(&self, id: UserId) -> CoreResult<User> {
        let row = sqlx::query("SELECT * FROM users WHERE id = $1")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?
            .ok_or_else(|| CoreError::not_found(format!("user {id} not found")))?;

        row_to_user(&row).map_err(|e| CoreError::Internal(e.into()))
    }

    async fn get_by_external_id(&self, external_id: &str) -> CoreResult<User> {
        let row = sqlx::query("SELECT * FROM users WHERE external_id = $1")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?
            .ok_or_else(|| CoreError::not_found(format!("user {external_id} not found")))?;

        row_to_user(&row).map_err(|e| CoreError::Internal(e.into()))
    }

    async fn upsert(&self, external_id: &str) -> CoreResult<User> {
        let row = sqlx::query(
            r#"INSERT INTO users (external_id) VALUES ($1)
               ON CONFLICT (external_id) DO UPDATE SET external_id = $1
               RETURNING *"#,
        )
        .bind(external_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        row_to_user(&row).map_err(|e| CoreError::Internal(e.into()))
    }
}
