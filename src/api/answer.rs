use crate::api::AppState;
use crate::domain::{Answer, Code, RegionId, UserId};
use crate::errors::CoreError;
use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct AnswerQuery {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "regionId")]
    region_id: String,
}

#[derive(Deserialize)]
pub struct AnswerBody {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "conditionId")]
    condition_id: String,
    #[serde(rename = "regionId")]
    region_id: String,
    value: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct AnswerDeleteBody {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "conditionId")]
    condition_id: String,
    #[serde(rename = "regionId")]
    region_id: String,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<AnswerQuery>,
) -> Result<Json<Vec<Answer>>, CoreError> {
    let region_id = RegionId::parse(&query.region_id)?;
    let rows = state
        .repos
        .answer
        .list_for_user_and_region(UserId(query.user_id), &region_id)
        .await?;
    Ok(Json(rows))
}

pub async fn upsert(State(state): State<AppState>, Json(body): Json<AnswerBody>) -> Result<(), CoreError> {
    let region_id = RegionId::parse(&body.region_id)?;
    let condition_id = Code::parse(&body.condition_id)?;
    let now = Utc::now();

    let answer = Answer {
        user_id: UserId(body.user_id),
        condition_id,
        region_id: region_id.clone(),
        value: body.value,
        created_at: now,
        updated_at: now,
    };

    state.repos.answer.upsert(&answer).await?;
    state.invalidator.on_answer_mutation(answer.user_id, &region_id).await?;

    Ok(())
}

pub async fn delete(State(state): State<AppState>, Json(body): Json<AnswerDeleteBody>) -> Result<(), CoreError> {
    let region_id = RegionId::parse(&body.region_id)?;
    let condition_id = Code::parse(&body.condition_id)?;
    let user_id = UserId(body.user_id);

    state.repos.answer.delete(user_id, &condition_id).await?;
    state.invalidator.on_answer_mutation(user_id, &region_id).await?;

    Ok(())
}
