use crate::api::AppState;
use crate::broker::{self, PRESENCE_CREATE_KEY, PRESENCE_DELETE_KEY};
use crate::domain::{DateRange, Presence, RegionId, UserId};
use crate::errors::CoreError;
use crate::logger::{log, LogTag};
use axum::extract::{Query, State};
use axum::Json;
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct PresenceQuery {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "regionId")]
    region_id: String,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct PresenceRangeBody {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "regionId")]
    region_id: String,
    start: NaiveDate,
    end: NaiveDate,
    #[serde(rename = "deviceId")]
    device_id: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PresenceQuery>,
) -> Result<Json<Vec<Presence>>, CoreError> {
    let region_id = RegionId::parse(&query.region_id)?;
    let start = query.start.unwrap_or(NaiveDate::MIN);
    let end = query.end.unwrap_or(NaiveDate::MAX);
    let rows = state
        .repos
        .presence
        .list_in_range(UserId(query.user_id), &region_id, start, end)
        .await?;
    Ok(Json(rows))
}

/// Accepts an inclusive `{start, end}` range and expands it server-side
/// (§6) — `PresenceRepository::create_range` is the expansion boundary,
/// presences are never stored as ranges.
pub async fn create(State(state): State<AppState>, Json(body): Json<PresenceRangeBody>) -> Result<(), CoreError> {
    let region_id = RegionId::parse(&body.region_id)?;
    let user_id = UserId(body.user_id);
    let range = DateRange {
        start: body.start,
        end: body.end,
    };

    state
        .repos
        .presence
        .create_range(user_id, &region_id, range, body.device_id.as_deref())
        .await?;
    state.invalidator.on_presence_mutation(user_id, &region_id).await?;
    publish_best_effort(&state, user_id, &region_id, PRESENCE_CREATE_KEY).await;

    Ok(())
}

pub async fn delete(State(state): State<AppState>, Json(body): Json<PresenceRangeBody>) -> Result<(), CoreError> {
    let region_id = RegionId::parse(&body.region_id)?;
    let user_id = UserId(body.user_id);
    let range = DateRange {
        start: body.start,
        end: body.end,
    };

    state.repos.presence.delete_range(user_id, &region_id, range).await?;
    state.invalidator.on_presence_mutation(user_id, &region_id).await?;
    publish_best_effort(&state, user_id, &region_id, PRESENCE_DELETE_KEY).await;

    Ok(())
}

/// A lost or delayed publish only delays the async recompute, never
/// correctness — so a publish failure is logged and swallowed rather
/// than failing the mutation that already invalidated the cache. The
/// worker queue only binds to `presence.create` (a delete is already
/// consistent after the synchronous invalidation above), but the message
/// is still announced on the exchange so other listeners can observe it.
async fn publish_best_effort(state: &AppState, user_id: UserId, region_id: &RegionId, routing_key: &str) {
    let Some(channel) = state.broker_channel.as_ref() else {
        return;
    };
    if let Err(e) = broker::publish_presence_mutation(channel, routing_key, user_id, region_id).await {
        log(LogTag::Api, "WARN", &format!("failed to publish {routing_key}: {e}"));
    }
}
