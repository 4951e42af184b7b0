use crate::api::AppState;
use crate::domain::UserId;
use crate::errors::CoreError;
use crate::repository::User;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct UserQuery {
    #[serde(rename = "externalId")]
    external_id: Option<String>,
    id: Option<i64>,
}

#[derive(Deserialize)]
pub struct UserBody {
    #[serde(rename = "externalId")]
    external_id: String,
}

pub async fn get(State(state): State<AppState>, Query(query): Query<UserQuery>) -> Result<Json<User>, CoreError> {
    let user = match (query.id, query.external_id) {
        (Some(id), _) => state.repos.user.get(UserId(id)).await?,
        (None, Some(external_id)) => state.repos.user.get_by_external_id(&external_id).await?,
        (None, None) => return Err(CoreError::validation("id or externalId is required")),
    };
    Ok(Json(user))
}

pub async fn upsert(State(state): State<AppState>, Json(body): Json<UserBody>) -> Result<Json<User>, CoreError> {
    Ok(Json(state.repos.user.upsert(&body.external_id).await?))
}
