use crate::domain::UserId;
use crate::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Row};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS devices (
    id TEXT PRIMARY KEY,
    user_id BIGINT NOT NULL,
    name TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
)"#;

/// A user's presence-reporting device. Out of scope for deep evaluation
/// logic (§1 Non-goals) — this exists so the CRUD surface in §6 has a
/// concrete backing store, not as an engineered device-management system.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: String,
    pub user_id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait DeviceRepository: Send + Sync {
    async fn list_for_user(&self, user_id: UserId) -> CoreResult<Vec<Device>>;
    async fn upsert(&self, device: &Device) -> CoreResult<()>;
    async fn delete(&self, id: &str) -> CoreResult<()>;
}

pub struct PostgresDeviceRepository {
    pool: PgPool,
}

impl PostgresDeviceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    async fn list_for_user(&self, user_id: UserId) -> CoreResult<Vec<Device>> {
        let rows = sqlx::query("SELECT * FROM devices WHERE user_id = $1")
            .bind(user_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter()
            .map(|r| {
                Ok(Device {
                    id: r.try_get("id").map_err(|e: sqlx::Error| CoreError::Internal(e.into()))?,
                    user_id: UserId(r.try_get("user_id").map_err(|e: sqlx::Error| CoreError::Internal(e.into()))?),
                    name: r.try_get("name").map_err(|e: sqlx::Error| CoreError::Internal(e.into()))?,
                    created_at: r.try_get("created_at").map_err(|e: sqlx::Error| CoreError::Internal(e.into()))?,
                })
            })
            .collect()
    }

    async fn upsert(&self, device: &Device) -> CoreResult<()> {
        sqlx::query(
            r#"INSERT INTO devices (id, user_id, name, created_at)
               VALUES ($1, $2, $3, $4)
               ON CONFLICT (id) DO UPDATE SET name = $3"#,
        )
        .bind(&device.id)
        .bind(device.user_id.0)
        .bind(&device.name)
        .bind(device.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        sqlx::query("DELETE FROM devices WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }
}
