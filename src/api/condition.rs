use crate::api::rule::RegionFilter;
use crate::api::AppState;
use crate::domain::{Code, ConditionDef, RegionId};
use crate::errors::CoreError;
use axum::extract::{Path, Query, State};
use axum::Json;

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<ConditionDef>, CoreError> {
    let id = Code::parse(&id)?;
    Ok(Json(state.repos.condition.get(&id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<RegionFilter>,
) -> Result<Json<Vec<ConditionDef>>, CoreError> {
    let region_id = RegionId::parse(&filter.region_id)?;
    Ok(Json(state.repos.condition.list_for_region(&region_id).await?))
}

pub async fn upsert(State(state): State<AppState>, Json(condition): Json<ConditionDef>) -> Result<(), CoreError> {
    state.repos.condition.upsert(&condition).await?;
    state.invalidator.on_condition_upsert(&condition.region_id).await?;
    Ok(())
}
