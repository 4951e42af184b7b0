use crate::domain::{Region, RegionId, RegionType};
use crate::errors::{CoreError, CoreResult};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS regions (
    id TEXT PRIMARY KEY,
    parent_region_id TEXT,
    name TEXT NOT NULL,
    region_type TEXT NOT NULL,
    continent TEXT NOT NULL,
    year_start_month INTEGER NOT NULL,
    year_start_day INTEGER NOT NULL,
    lat DOUBLE PRECISION,
    lng DOUBLE PRECISION,
    sources TEXT[] NOT NULL DEFAULT '{}'
)"#;

/// Process-wide catalog data, mutated only by the out-of-band seed path
/// (§3 Ownership). Reads happen on every context build.
#[async_trait]
pub trait RegionRepository: Send + Sync {
    async fn get(&self, id: &RegionId) -> CoreResult<Region>;
    async fn list(&self) -> CoreResult<Vec<Region>>;
    async fn upsert(&self, region: &Region) -> CoreResult<()>;
}

pub struct PostgresRegionRepository {
    pool: PgPool,
}

impl PostgresRegionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_region(row: &sqlx::postgres::PgRow) -> Result<Region, sqlx::Error> {
    let region_type: String = row.try_get("region_type")?;
    let region_type = match region_type.as_str() {
        "country" => RegionType::Country,
        "province" => RegionType::Province,
        "zone" => RegionType::Zone,
        other => {
            return Err(sqlx::Error::Decode(
                format!("unknown region_type {other}").into(),
            ))
        }
    };

    let lat: Option<f64> = row.try_get("lat")?;
    let lng: Option<f64> = row.try_get("lng")?;
    let lat_lng = match (lat, lng) {
        (Some(lat), Some(lng)) => Some(crate::domain::LatLng { lat, lng }),
        _ => None,
    };

    let id: String = row.try_get("id")?;
    let parent: Option<String> = row.try_get("parent_region_id")?;

    Ok(Region {
        id: RegionId::parse(&id).map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        parent_region_id: parent
            .map(|p| RegionId::parse(&p))
            .transpose()
            .map_err(|e| sqlx::Error::Decode(e.to_string().into()))?,
        name: row.try_get("name")?,
        region_type,
        continent: row.try_get("continent")?,
        year_start_month: row.try_get::<i32, _>("year_start_month")? as u32,
        year_start_day: row.try_get::<i32, _>("year_start_day")? as u32,
        lat_lng,
        sources: row.try_get("sources")?,
    })
}

#[async_trait]
impl RegionRepository for PostgresRegionRepository {
    async fn get(&self, id: &RegionId) -> CoreResult<Region> {
        let row = sqlx::query("SELECT * FROM regions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?
            .ok_or_else(|| CoreError::not_found(format!("region {id} not found")))?;

        row_to_region(&row).map_err(|e| CoreError::Internal(e.into()))
    }

    async fn list(&self) -> CoreResult<Vec<Region>> {
        let rows = sqlx::query("SELECT * FROM regions")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(e.into()))?;

        rows.iter()
            .map(|r| row_to_region(r).map_err(|e| CoreError::Internal(e.into())))
            .collect()
    }

    async fn upsert(&self, region: &Region) -> CoreResult<()> {
        let region_type = match region.region_type {
            RegionType::Country => "country",
            RegionType::Province => "province",
            RegionType::Zone => "zone",
        };

        sqlx::query(
            r#"INSERT INTO regions (id, parent_region_id, name, region_type, continent, year_start_month, year_start_day, lat, lng, sources)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               ON CONFLICT (id) DO UPDATE SET
                 parent_region_id = $2, name = $3, region_type = $4, continent = $5,
                 year_start_month = $6, year_start_day = $7, lat = $8, lng = $9, sources = $10"#,
        )
        .bind(region.id.as_str())
        .bind(region.parent_region_id.as_ref().map(|r| r.as_str()))
        .bind(&region.name)
        .bind(region_type)
        .bind(&region.continent)
        .bind(region.year_start_month as i32)
        .bind(region.year_start_day as i32)
        .bind(region.lat_lng.as_ref().map(|l| l.lat))
        .bind(region.lat_lng.as_ref().map(|l| l.lng))
        .bind(&region.sources)
        .execute(&self.pool)
        .await
        .map_err(|e| CoreError::Internal(e.into()))?;

        Ok(())
    }
}
