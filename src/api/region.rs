use crate::api::AppState;
use crate::domain::{Region, RegionId};
use crate::errors::CoreError;
use axum::extract::{Path, State};
use axum::Json;

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Region>, CoreError> {
    let id = RegionId::parse(&id)?;
    Ok(Json(state.repos.region.get(&id).await?))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Region>>, CoreError> {
    Ok(Json(state.repos.region.list().await?))
}

pub async fn upsert(State(state): State<AppState>, Json(region): Json<Region>) -> Result<(), CoreError> {
    state.repos.region.upsert(&region).await?;
    state.invalidator.on_region_upsert(&region.id).await?;
    Ok(())
}
