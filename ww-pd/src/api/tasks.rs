//! Trigger and control endpoints
//!
//! Manual task triggers run the same bodies as the scheduled loops
//! (same per-type overlap gates) and return the task's structured outcome.
//! They report failure in the payload rather than crashing the host.

use crate::error::{ApiError, ApiResult};
use crate::models::{Prediction, PredictionStatus};
use crate::scheduler::SchedulerStatus;
use crate::store::{self, PredictionUpsert};
use crate::types::TaskRecord;
use crate::verifier::VerificationOutcome;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use ww_common::calendar;

/// Largest backfill range accepted in one request
const MAX_BACKFILL_SPAN: i64 = 500;

/// POST /tasks/collect
pub async fn trigger_collect(State(state): State<AppState>) -> Json<TaskRecord> {
    Json(state.scheduler.run_daily_collection().await)
}

/// POST /tasks/verify
pub async fn trigger_verify(State(state): State<AppState>) -> Json<TaskRecord> {
    Json(state.scheduler.run_hourly_verification().await)
}

#[derive(Debug, Deserialize)]
pub struct BackfillRequest {
    pub start: i64,
    pub end: i64,
}

/// POST /tasks/backfill
pub async fn trigger_backfill(
    State(state): State<AppState>,
    Json(request): Json<BackfillRequest>,
) -> ApiResult<Json<TaskRecord>> {
    if request.start < 0 || request.start > request.end {
        return Err(ApiError::BadRequest(format!(
            "invalid game number range {}..={}",
            request.start, request.end
        )));
    }
    if request.end - request.start + 1 > MAX_BACKFILL_SPAN {
        return Err(ApiError::BadRequest(format!(
            "range exceeds {} games per request",
            MAX_BACKFILL_SPAN
        )));
    }
    Ok(Json(
        state.scheduler.run_backfill(request.start, request.end).await,
    ))
}

#[derive(Debug, Deserialize)]
pub struct ManualVerifyRequest {
    pub sources: Vec<String>,
}

/// POST /predictions/:game_number/verify
///
/// Re-run the agreement rule against previously recorded results for the
/// supplied sources, without a fresh network fetch.
pub async fn verify_game(
    State(state): State<AppState>,
    Path(game_number): Path<i64>,
    Json(request): Json<ManualVerifyRequest>,
) -> ApiResult<Json<VerificationOutcome>> {
    if request.sources.is_empty() {
        return Err(ApiError::BadRequest("source list is empty".to_string()));
    }
    let outcome = state
        .scheduler
        .verify_manual(game_number, &request.sources)
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
pub struct ManualSetRequest {
    pub word: String,
    pub status: String,
    #[serde(default)]
    pub force: bool,
}

/// PUT /predictions/:game_number
///
/// Operator override: set word and status directly, creating the row if it
/// does not exist. `force` bypasses the verified-guard.
pub async fn set_prediction(
    State(state): State<AppState>,
    Path(game_number): Path<i64>,
    Json(request): Json<ManualSetRequest>,
) -> ApiResult<Json<Prediction>> {
    let word = request.word.trim().to_ascii_uppercase();
    if word.len() != 5 || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ApiError::BadRequest(format!(
            "{:?} is not a 5-letter word",
            request.word
        )));
    }
    let status = PredictionStatus::parse(&request.status)
        .ok_or_else(|| ApiError::BadRequest(format!("unknown status {:?}", request.status)))?;

    let existing = store::get_by_game_number(&state.db, game_number).await?;
    let prediction = match existing {
        Some(_) => store::set_manual(&state.db, game_number, &word, status, request.force).await?,
        None => {
            let date = calendar::date_for_game(game_number)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
            let input = PredictionUpsert {
                game_number,
                date,
                word: Some(word.clone()),
                status,
                confidence: if status == PredictionStatus::Verified {
                    1.0
                } else {
                    0.4
                },
                sources: vec!["manual".to_string()],
                hints: Some(crate::hints::derive_hints(&word)),
            };
            store::upsert_prediction(&state.db, &input).await?;
            store::get_by_game_number(&state.db, game_number)
                .await?
                .ok_or_else(|| ApiError::Internal("row vanished after upsert".to_string()))?
        }
    };
    Ok(Json(prediction))
}

/// POST /scheduler/start
pub async fn scheduler_start(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.start().await)
}

/// POST /scheduler/stop
pub async fn scheduler_stop(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.stop().await)
}

/// GET /scheduler/status
pub async fn scheduler_status(State(state): State<AppState>) -> Json<SchedulerStatus> {
    Json(state.scheduler.status().await)
}

/// GET /scheduler/history
pub async fn scheduler_history(State(state): State<AppState>) -> Json<Vec<TaskRecord>> {
    Json(state.scheduler.history().await)
}

pub fn task_routes() -> Router<AppState> {
    Router::new()
        .route("/tasks/collect", post(trigger_collect))
        .route("/tasks/verify", post(trigger_verify))
        .route("/tasks/backfill", post(trigger_backfill))
        .route("/predictions/:game_number/verify", post(verify_game))
        .route("/predictions/:game_number", put(set_prediction))
        .route("/scheduler/start", post(scheduler_start))
        .route("/scheduler/stop", post(scheduler_stop))
        .route("/scheduler/status", get(scheduler_status))
        .route("/scheduler/history", get(scheduler_history))
}
