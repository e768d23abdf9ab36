//! HTTP request handlers.

use super::AppState;
use crate::db::{DbError, MonitorStore};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;

const DEFAULT_CHECK_HOURS: i64 = 24;
const MAX_CHECK_HOURS: i64 = 24 * 365;

fn db_error_response(e: DbError) -> Response {
    match e {
        DbError::NotFound => (StatusCode::NOT_FOUND, "Endpoint not found").into_response(),
        other => (StatusCode::INTERNAL_SERVER_ERROR, other.to_string()).into_response(),
    }
}

pub async fn handle_healthz() -> &'static str {
    "ok"
}

// ============================================================================
// API: Endpoints
// ============================================================================

pub async fn handle_get_endpoints(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_endpoints() {
        Ok(endpoints) => Json(endpoints).into_response(),
        Err(e) => db_error_response(e),
    }
}

pub async fn handle_get_endpoint(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    match state.store.get_endpoint(id) {
        Ok(endpoint) => Json(endpoint).into_response(),
        Err(e) => db_error_response(e),
    }
}

// ============================================================================
// API: Checks
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChecksQuery {
    #[serde(default)]
    pub hours: Option<i64>,
}

pub async fn handle_get_checks(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ChecksQuery>,
) -> impl IntoResponse {
    let hours = query.hours.unwrap_or(DEFAULT_CHECK_HOURS);
    if hours <= 0 {
        return (StatusCode::BAD_REQUEST, "hours must be positive").into_response();
    }

    if let Err(e) = state.store.get_endpoint(id) {
        return db_error_response(e);
    }

    let end = Utc::now();
    let start = end - ChronoDuration::hours(hours.min(MAX_CHECK_HOURS));

    match state.store.checks_between(id, start, end) {
        Ok(checks) => Json(checks).into_response(),
        Err(e) => db_error_response(e),
    }
}
