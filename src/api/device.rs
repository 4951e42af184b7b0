use crate::api::AppState;
use crate::domain::UserId;
use crate::errors::CoreError;
use crate::repository::Device;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct UserFilter {
    #[serde(rename = "userId")]
    user_id: i64,
}

#[derive(Deserialize)]
pub struct DeviceBody {
    id: String,
    #[serde(rename = "userId")]
    user_id: i64,
    name: String,
}

#[derive(Deserialize)]
pub struct DeviceDeleteBody {
    id: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<UserFilter>,
) -> Result<Json<Vec<Device>>, CoreError> {
    Ok(Json(state.repos.device.list_for_user(UserId(query.user_id)).await?))
}

pub async fn upsert(State(state): State<AppState>, Json(body): Json<DeviceBody>) -> Result<(), CoreError> {
    let device = Device {
        id: body.id,
        user_id: UserId(body.user_id),
        name: body.name,
        created_at: Utc::now(),
    };
    state.repos.device.upsert(&device).await?;
    Ok(())
}

pub async fn delete(State(state): State<AppState>, Json(body): Json<DeviceDeleteBody>) -> Result<(), CoreError> {
    state.repos.device.delete(&body.id).await?;
    Ok(())
}
