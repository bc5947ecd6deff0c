//! ww-pd library interface
//!
//! Exposes the pipeline components for integration testing: collectors and
//! the fallback chain, the consensus verifier, the prediction store, and
//! the scheduler.

pub mod api;
pub mod collectors;
pub mod config;
pub mod error;
pub mod hints;
pub mod models;
pub mod parsers;
pub mod scheduler;
pub mod store;
pub mod types;
pub mod verifier;

pub use crate::error::{ApiError, ApiResult};

use crate::scheduler::PipelineScheduler;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// The single logical scheduler instance
    pub scheduler: Arc<PipelineScheduler>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, scheduler: Arc<PipelineScheduler>) -> Self {
        Self {
            db,
            scheduler,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::prediction_routes())
        .merge(api::task_routes())
        .merge(api::health_routes())
        .with_state(state)
}
