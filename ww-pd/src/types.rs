//! Core pipeline types: collection results, error taxonomy, task records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Collector-level error taxonomy
///
/// Collectors fail closed: every failure mode is captured into one of these
/// categories and carried inside the `CollectionResult`, never thrown past
/// the collector boundary.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum CollectError {
    /// Request exceeded its deadline
    #[error("request timed out")]
    Timeout,

    /// Connection-level failure (refused, DNS, TLS)
    #[error("network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success HTTP status
    #[error("HTTP error {0}")]
    Http(u16),

    /// Response body did not match the expected shape or patterns
    #[error("parse error: {0}")]
    Parse(String),
}

/// Output of a single collector invocation for one source and one date.
///
/// Ephemeral, never persisted. Either `word`/`game_number` are set
/// (success) or `error` is (failure).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionResult {
    pub success: bool,
    pub source_id: String,
    pub game_number: Option<i64>,
    pub word: Option<String>,
    pub date: Option<NaiveDate>,
    pub error: Option<CollectError>,
    /// Which fallback rung produced the data (authoritative collector only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<String>,
}

impl CollectionResult {
    pub fn success(
        source_id: impl Into<String>,
        game_number: i64,
        word: String,
        date: NaiveDate,
    ) -> Self {
        Self {
            success: true,
            source_id: source_id.into(),
            game_number: Some(game_number),
            word: Some(word),
            date: Some(date),
            error: None,
            via: None,
        }
    }

    pub fn via(mut self, rung: impl Into<String>) -> Self {
        self.via = Some(rung.into());
        self
    }

    pub fn failure(source_id: impl Into<String>, error: CollectError) -> Self {
        Self {
            success: false,
            source_id: source_id.into(),
            game_number: None,
            word: None,
            date: None,
            error: Some(error),
            via: None,
        }
    }
}

/// Scheduler task types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    DailyCollection,
    HourlyVerification,
    Backfill,
}

impl TaskType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskType::DailyCollection => "daily_collection",
            TaskType::HourlyVerification => "hourly_verification",
            TaskType::Backfill => "backfill",
        }
    }
}

/// One scheduler task execution, retained for operator inspection
#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: Uuid,
    pub task_type: TaskType,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<String>,
    pub error: Option<String>,
}

impl TaskRecord {
    pub fn started(task_type: TaskType) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type,
            started_at: Utc::now(),
            finished_at: None,
            outcome: None,
            error: None,
        }
    }

    pub fn finish_ok(mut self, outcome: impl Into<String>) -> Self {
        self.finished_at = Some(Utc::now());
        self.outcome = Some(outcome.into());
        self
    }

    pub fn finish_err(mut self, error: impl Into<String>) -> Self {
        self.finished_at = Some(Utc::now());
        self.error = Some(error.into());
        self
    }
}
