//! Read-only projections of the prediction store

use crate::error::{ApiError, ApiResult};
use crate::models::Prediction;
use crate::store::{self, StoreStats};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use ww_common::calendar;

const DEFAULT_LIMIT: i64 = 30;
const MAX_LIMIT: i64 = 365;

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

/// GET /predictions/today
///
/// The prediction for today's puzzle, trying each day-boundary date
/// candidate in order.
pub async fn get_today(State(state): State<AppState>) -> ApiResult<Json<Prediction>> {
    for date in calendar::today_candidates(Utc::now()) {
        if let Some(prediction) = store::get_by_date(&state.db, date).await? {
            return Ok(Json(prediction));
        }
    }
    Err(ApiError::NotFound("no prediction for today yet".to_string()))
}

/// GET /predictions/latest
pub async fn get_latest(State(state): State<AppState>) -> ApiResult<Json<Prediction>> {
    store::get_latest(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("no predictions recorded".to_string()))
}

/// GET /predictions/recent?limit=N
pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<Prediction>>> {
    let rows = store::list_recent(&state.db, clamp_limit(query.limit)).await?;
    Ok(Json(rows))
}

/// GET /predictions/candidates?limit=N
///
/// Unresolved predictions awaiting further evidence.
pub async fn list_candidates(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Json<Vec<Prediction>>> {
    let rows = store::list_candidates(&state.db, clamp_limit(query.limit)).await?;
    Ok(Json(rows))
}

/// GET /predictions/:game_number
pub async fn get_by_game_number(
    State(state): State<AppState>,
    Path(game_number): Path<i64>,
) -> ApiResult<Json<Prediction>> {
    store::get_by_game_number(&state.db, game_number)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("prediction for game {}", game_number)))
}

/// GET /stats
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StoreStats>> {
    Ok(Json(store::stats(&state.db).await?))
}

pub fn prediction_routes() -> Router<AppState> {
    Router::new()
        .route("/predictions/today", get(get_today))
        .route("/predictions/latest", get(get_latest))
        .route("/predictions/recent", get(list_recent))
        .route("/predictions/candidates", get(list_candidates))
        .route("/predictions/:game_number", get(get_by_game_number))
        .route("/stats", get(get_stats))
}
