//! HTTP surface (§6). Explicitly thin per the Non-goals: routing,
//! (de)serialization, and error-to-status mapping only — no
//! authentication, no request validation beyond what the domain types
//! already enforce on construction. Feature-gated behind `web` since the
//! evaluation core has no dependency on it.

mod answer;
mod condition;
mod device;
mod evaluate;
mod presence;
mod region;
mod rule;
mod user;

use crate::context::CacheInvalidator;
use crate::errors::{CoreError, ErrorKind};
use crate::repository::Repositories;
use crate::service::EvaluationService;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use lapin::Channel;
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub service: Arc<EvaluationService>,
    pub invalidator: Arc<CacheInvalidator>,
    pub broker_channel: Option<Channel>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/region", get(region::list).post(region::upsert))
        .route("/region/:id", get(region::get))
        .route("/rule", get(rule::list).post(rule::upsert))
        .route("/rule/:id", get(rule::get))
        .route("/condition", get(condition::list).post(condition::upsert))
        .route("/condition/:id", get(condition::get))
        .route("/evaluate/:region_id", get(evaluate::evaluate))
        .route(
            "/presence",
            get(presence::list).post(presence::create).delete(presence::delete),
        )
        .route(
            "/answer",
            get(answer::list).post(answer::upsert).delete(answer::delete),
        )
        .route(
            "/device",
            get(device::list).post(device::upsert).delete(device::delete),
        )
        .route("/user", get(user::get).post(user::upsert))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JSON error envelope shared by every handler.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps `CoreError::kind()` to the status codes §7 specifies: `NotFound`
/// → 404, `Validation` → 400, `Internal` → 500.
impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}
