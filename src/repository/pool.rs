//! Postgres pool setup and schema bootstrap. The teacher opens a single
//! `rusqlite::Connection` and runs `CREATE TABLE IF NOT EXISTS` blocks at
//! startup (`database/connection.rs`); this does the async-pool
//! equivalent against Postgres, one `CREATE TABLE IF NOT EXISTS` per
//! entity rather than one big migration file, so each repository module
//! owns its own table's shape.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn connect(database_dsn: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_dsn)
        .await
        .with_context(|| "failed to connect to postgres")?;

    initialize_schema(&pool).await?;

    Ok(pool)
}

async fn initialize_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(crate::repository::region::SCHEMA).execute(pool).await?;
    sqlx::query(crate::repository::rule::SCHEMA).execute(pool).await?;
    sqlx::query(crate::repository::condition::SCHEMA).execute(pool).await?;
    sqlx::query(crate::repository::presence::SCHEMA).execute(pool).await?;
    sqlx::query(crate::repository::answer::SCHEMA).execute(pool).await?;
    sqlx::query(crate::repository::evaluation::SCHEMA).execute(pool).await?;
    sqlx::query(crate::repository::device::SCHEMA).execute(pool).await?;
    sqlx::query(crate::repository::user::SCHEMA).execute(pool).await?;
    Ok(())
}
