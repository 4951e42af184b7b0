use crate::api::AppState;
use crate::domain::{EvaluateOpts, RegionEvaluation, RegionId, UserId};
use crate::errors::CoreError;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct EvaluateQuery {
    #[serde(rename = "pointInTime")]
    point_in_time: Option<String>,
    /// Stands in for the authenticated caller's identity until the
    /// real auth collaborator (out of scope, §1 Non-goals) resolves it.
    #[serde(rename = "userId")]
    user_id: i64,
}

/// `GET /evaluate/{regionId}?pointInTime=YYYY-MM-DD&userId=…` (§6). `404`
/// on an unknown region, `500` on any other failure — both fall out of
/// `CoreError`'s `IntoResponse` impl without special-casing here.
pub async fn evaluate(
    State(state): State<AppState>,
    Path(region_id): Path<String>,
    Query(query): Query<EvaluateQuery>,
) -> Result<Json<RegionEvaluation>, CoreError> {
    let region_id = RegionId::parse(&region_id)?;
    let point_in_time = match query.point_in_time {
        Some(raw) => parse_point_in_time(&raw)?,
        None => Utc::now(),
    };

    let opts = EvaluateOpts {
        point_in_time,
        ..EvaluateOpts::default()
    };

    let evaluation = state
        .service
        .evaluate_region(UserId(query.user_id), &region_id, opts)
        .await?;
    Ok(Json(evaluation))
}

fn parse_point_in_time(raw: &str) -> Result<DateTime<Utc>, CoreError> {
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| CoreError::validation(format!("invalid pointInTime: {raw}")))?;
    Ok(date.and_hms_opt(0, 0, 0).unwrap().and_utc())
}
