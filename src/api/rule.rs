use crate::api::AppState;
use crate::domain::{Code, Rule, RegionId};
use crate::errors::CoreError;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RegionFilter {
    #[serde(rename = "regionId")]
    pub region_id: String,
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Rule>, CoreError> {
    let id = Code::parse(&id)?;
    Ok(Json(state.repos.rule.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<RegionFilter>,
) -> Result<Json<Vec<Rule>>, CoreError> {
    let region_id = RegionId::parse(&filter.region_id)?;
    Ok(Json(state.repos.rule.list_for_region(&region_id).await?))
}

pub async fn upsert(State(state): State<AppState>, Json(rule): Json<Rule>) -> Result<(), CoreError> {
    state.repos.rule.upsert(&rule).await?;
    state.invalidator.on_rule_upsert(&rule.region_id).await?;
    Ok(())
}
