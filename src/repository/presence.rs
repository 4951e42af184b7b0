use crate::domain::{DateRange, Presence, RegionId, UserId};
use crate::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS presences (
    user_id BIGINT NOT NULL,
    region_id TEXT NOT NULL,
    date DATE NOT NULL,
    device_id TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (user_id, region_id, date)
)"#;

/// Per-user data (§3 Ownership). Dense by construction — a `DateRange` is
/// expanded into one row per calendar day before it reaches the
/// repository, never stored as a range (§4.4 invalidation keys off
/// `(user, region)`, which only works cleanly against dense rows).
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    async fn list_in_range(
        &self,
        user_id: UserId,
        region_id: &RegionId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<Vec<Presence>>;

    async fn create_range(
        &self,
        user_id: UserId,
        region_id: &RegionId,
        range: DateRange,
        device_id: Option<&str>,
    ) -> CoreResult<()>;

    async fn delete_range(
        &self,
        user_id: UserId,
        region_id: &RegionId,
        range: DateRange,
    ) -> CoreResult<()>;
}

pub struct PostgresPresenceRepository {
    pool: PgPool,
}

impl PostgresPresenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_presence(row: &sqlx::postgres::PgRow) -> Result<Presence, sqlx::Error> {
    let region_id: String = row.try_get("region_id")?;
    Ok(Presence {
        user_id: UserId(row.try_get("user_id")?),
        region_id: RegionId::parse(&region_id).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        date: row.try_get("date")?,
        device_id: row.try_get("device_id")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl PresenceRepository for PostgresPresenceRepository {
    async fn list_in_range(
        &self,
        user_id: UserId,
        region_id: &RegionId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<Vec<Presence>> {
        let rows = sqlx::query(
            "SELECT * FROM presences WHERE user_id = $1 AND region_id = $2 AND date BETWEEN $3 AND $4",
        )
        .bind(user_id.0)
        .bind(region_id.as_str())
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter()
            .map(|r| row_to_presence(r).map_err(|e| CoreError::Internal(e.into())))
            .collect()
    }

    async fn create_range(
        &self,
        user_id: UserId,
        region_id: &RegionId,
        range: DateRange,
        device_id: Option<&str>,
    ) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(|e| CoreError::Internal(e.into()))?;

        for date in range.expand() {
            sqlx::query(
                r#"INSERT INTO presences (user_id, region_id, date, device_id, created_at, updated_at)
                   VALUES ($1, $2, $3, $4, now(), now())
                   ON CONFLICT (user_id, region_id, date) DO UPDATE SET device_id = $4, updated_at = now()"#,
            )
            .bind(user_id.0)
            .bind(region_id.as_str())
            .bind(date)
            .bind(device_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;
        }

        tx.commit().await.map_err(|e| CoreError::Internal(e.into()))?;
        Ok(())
    }

    async fn delete_range(
        &self,
        user_id: UserId,
        region_id: &RegionId,
        range: DateRange,
    ) -> CoreResult<()> {
        sqlx::query("DELETE FROM presences WHERE user_id = $1 AND region_id = $2 AND date BETWEEN $3 AND $4")
            .bind(user_id.0)
            .bind(region_id.as_str())
            .bind(range.start)
            .bind(range.end)
            .execute(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }
}
