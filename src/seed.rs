//! Seed loader stub (§1 Non-goals — out of scope for deep logic). Reads a
//! JSON file of regions/rules/conditions and upserts them through the
//! same repositories the API uses, so a freshly provisioned database ends
//! up in exactly the state a sequence of `PUT` calls would have produced.

use crate::domain::{ConditionDef, Region, Rule};
use crate::errors::CoreError;
use crate::logger::{log, LogTag};
use crate::repository::Repositories;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub regions: Vec<Region>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub conditions: Vec<ConditionDef>,
}

pub async fn run(repos: &Repositories, path: &str) -> Result<(), CoreError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CoreError::Internal(anyhow::anyhow!("reading seed file {path}: {e}")))?;
    let seed: SeedFile =
        serde_json::from_str(&raw).map_err(|e| CoreError::validation(format!("invalid seed file: {e}")))?;

    for region in &seed.regions {
        repos.region.upsert(region).await?;
    }
    for condition in &seed.conditions {
        repos.condition.upsert(condition).await?;
    }
    for rule in &seed.rules {
        repos.rule.upsert(rule).await?;
    }

    log(
        LogTag::System,
        "SUCCESS",
        &format!(
            "seeded {} regions, {} conditions, {} rules from {path}",
            seed.regions.len(),
            seed.conditions.len(),
            seed.rules.len()
        ),
    );

    Ok(())
}
