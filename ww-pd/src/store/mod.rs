//! Prediction store: the durable state machine keyed by game number
//!
//! All lifecycle guards live in single conditional SQL statements so they
//! are atomic per key. Callers never get to observe a half-applied
//! transition, and concurrent writers for the same game number are settled
//! by the guard, not by request ordering.

pub mod overrides;

use crate::models::{Hints, Prediction, PredictionStatus};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Illegal state-machine move, rejected at the store boundary
    #[error("invalid transition {from:?} -> {to:?} for game {game_number}")]
    InvalidTransition {
        game_number: i64,
        from: PredictionStatus,
        to: PredictionStatus,
    },

    #[error("prediction for game {0} not found")]
    NotFound(i64),

    #[error("corrupt prediction row: {0}")]
    Corrupt(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Input to `upsert_prediction`
#[derive(Debug, Clone)]
pub struct PredictionUpsert {
    pub game_number: i64,
    pub date: NaiveDate,
    pub word: Option<String>,
    pub status: PredictionStatus,
    pub confidence: f64,
    pub sources: Vec<String>,
    pub hints: Option<Hints>,
}

#[derive(sqlx::FromRow)]
struct PredictionRow {
    game_number: i64,
    date: String,
    predicted_word: Option<String>,
    verified_word: Option<String>,
    status: String,
    confidence_score: f64,
    verification_sources: String,
    hints: Option<String>,
    created_at: String,
    updated_at: String,
}

impl PredictionRow {
    fn into_prediction(self) -> StoreResult<Prediction> {
        let date = NaiveDate::parse_from_str(&self.date, "%Y-%m-%d")
            .map_err(|e| StoreError::Corrupt(format!("date {:?}: {}", self.date, e)))?;
        let status = PredictionStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("status {:?}", self.status)))?;
        let verification_sources: Vec<String> = serde_json::from_str(&self.verification_sources)
            .map_err(|e| StoreError::Corrupt(format!("verification_sources: {}", e)))?;
        let hints: Option<Hints> = match self.hints {
            Some(json) => Some(
                serde_json::from_str(&json)
                    .map_err(|e| StoreError::Corrupt(format!("hints: {}", e)))?,
            ),
            None => None,
        };
        let created_at = parse_timestamp(&self.created_at)?;
        let updated_at = parse_timestamp(&self.updated_at)?;

        Ok(Prediction {
            game_number: self.game_number,
            date,
            predicted_word: self.predicted_word,
            verified_word: self.verified_word,
            status,
            confidence_score: self.confidence_score,
            verification_sources,
            hints,
            created_at,
            updated_at,
        })
    }
}

fn parse_timestamp(s: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("timestamp {:?}: {}", s, e)))
}

/// Insert or update the row for a game number.
///
/// Idempotent: re-applying identical inputs changes nothing but
/// `updated_at`. The conditional update clause makes the verified-guard
/// atomic: a `verified` row is never downgraded by a non-verified write.
/// Use `set_manual` with force to override.
pub async fn upsert_prediction(pool: &SqlitePool, input: &PredictionUpsert) -> StoreResult<()> {
    let now = Utc::now().to_rfc3339();
    let verified_word = if input.status == PredictionStatus::Verified {
        input.word.clone()
    } else {
        None
    };
    let sources_json = serde_json::to_string(&input.sources)
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;
    let hints_json = match &input.hints {
        Some(h) => Some(serde_json::to_string(h).map_err(|e| StoreError::Corrupt(e.to_string()))?),
        None => None,
    };

    sqlx::query(
        "INSERT INTO predictions (
            game_number, date, predicted_word, verified_word, status,
            confidence_score, verification_sources, hints, created_at, updated_at
         ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(game_number) DO UPDATE SET
            predicted_word       = excluded.predicted_word,
            verified_word        = excluded.verified_word,
            status               = excluded.status,
            confidence_score     = excluded.confidence_score,
            verification_sources = excluded.verification_sources,
            hints                = COALESCE(excluded.hints, predictions.hints),
            updated_at           = excluded.updated_at
         WHERE predictions.status != 'verified' OR excluded.status = 'verified'",
    )
    .bind(input.game_number)
    .bind(input.date.format("%Y-%m-%d").to_string())
    .bind(&input.word)
    .bind(&verified_word)
    .bind(input.status.as_str())
    .bind(input.confidence)
    .bind(&sources_json)
    .bind(&hints_json)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Move a row to a new status, enforcing the transition table atomically.
///
/// The guard is the WHERE clause of a single UPDATE: the row must currently
/// be in a state allowed to move to `new_status`. Zero rows affected on an
/// existing row means the transition was illegal. `force` bypasses the
/// table (operator retry of a failed row, explicit verified override).
pub async fn update_status(
    pool: &SqlitePool,
    game_number: i64,
    new_status: PredictionStatus,
    force: bool,
) -> StoreResult<Prediction> {
    let now = Utc::now().to_rfc3339();

    let affected = if force {
        sqlx::query(
            "UPDATE predictions SET status = ?, updated_at = ? WHERE game_number = ?",
        )
        .bind(new_status.as_str())
        .bind(&now)
        .bind(game_number)
        .execute(pool)
        .await?
        .rows_affected()
    } else {
        let allowed: Vec<&str> = [
            PredictionStatus::Predicted,
            PredictionStatus::Candidate,
            PredictionStatus::Verified,
            PredictionStatus::Failed,
        ]
        .iter()
        .filter(|s| s.can_transition_to(new_status))
        .map(|s| s.as_str())
        .collect();

        if allowed.is_empty() {
            // No state may move here without force (e.g. back to predicted)
            0
        } else {
            // Placeholders generated from the allowed-status list; the guard
            // and the write are one atomic statement.
            let placeholders = vec!["?"; allowed.len()].join(", ");
            let sql = format!(
                "UPDATE predictions SET status = ?, updated_at = ? \
                 WHERE game_number = ? AND status IN ({})",
                placeholders
            );
            let mut query = sqlx::query(&sql)
                .bind(new_status.as_str())
                .bind(&now)
                .bind(game_number);
            for s in &allowed {
                query = query.bind(*s);
            }
            query.execute(pool).await?.rows_affected()
        }
    };

    if affected == 0 {
        // Distinguish a missing row from an illegal transition
        let current = get_by_game_number(pool, game_number)
            .await?
            .ok_or(StoreError::NotFound(game_number))?;
        return Err(StoreError::InvalidTransition {
            game_number,
            from: current.status,
            to: new_status,
        });
    }

    get_by_game_number(pool, game_number)
        .await?
        .ok_or(StoreError::NotFound(game_number))
}

/// Operator override: set word/status directly. Without `force` the
/// verified-guard still applies and the call fails on a verified row.
pub async fn set_manual(
    pool: &SqlitePool,
    game_number: i64,
    word: &str,
    status: PredictionStatus,
    force: bool,
) -> StoreResult<Prediction> {
    let now = Utc::now().to_rfc3339();
    let verified_word = if status == PredictionStatus::Verified {
        Some(word)
    } else {
        None
    };

    let guard = if force {
        ""
    } else {
        " AND (status != 'verified' OR ? = 'verified')"
    };
    let sql = format!(
        "UPDATE predictions SET predicted_word = ?, verified_word = ?, status = ?, \
         verification_sources = ?, updated_at = ? WHERE game_number = ?{}",
        guard
    );

    let mut query = sqlx::query(&sql)
        .bind(word)
        .bind(verified_word)
        .bind(status.as_str())
        .bind("[\"manual\"]")
        .bind(&now)
        .bind(game_number);
    if !force {
        query = query.bind(status.as_str());
    }

    let affected = query.execute(pool).await?.rows_affected();
    if affected == 0 {
        let current = get_by_game_number(pool, game_number)
            .await?
            .ok_or(StoreError::NotFound(game_number))?;
        return Err(StoreError::InvalidTransition {
            game_number,
            from: current.status,
            to: status,
        });
    }

    get_by_game_number(pool, game_number)
        .await?
        .ok_or(StoreError::NotFound(game_number))
}

pub async fn get_by_game_number(
    pool: &SqlitePool,
    game_number: i64,
) -> StoreResult<Option<Prediction>> {
    let row: Option<PredictionRow> =
        sqlx::query_as("SELECT * FROM predictions WHERE game_number = ?")
            .bind(game_number)
            .fetch_optional(pool)
            .await?;
    row.map(PredictionRow::into_prediction).transpose()
}

pub async fn get_by_date(pool: &SqlitePool, date: NaiveDate) -> StoreResult<Option<Prediction>> {
    let row: Option<PredictionRow> = sqlx::query_as("SELECT * FROM predictions WHERE date = ?")
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_optional(pool)
        .await?;
    row.map(PredictionRow::into_prediction).transpose()
}

/// The highest game number on record
pub async fn get_latest(pool: &SqlitePool) -> StoreResult<Option<Prediction>> {
    let row: Option<PredictionRow> =
        sqlx::query_as("SELECT * FROM predictions ORDER BY game_number DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;
    row.map(PredictionRow::into_prediction).transpose()
}

pub async fn list_recent(pool: &SqlitePool, limit: i64) -> StoreResult<Vec<Prediction>> {
    let rows: Vec<PredictionRow> =
        sqlx::query_as("SELECT * FROM predictions ORDER BY game_number DESC LIMIT ?")
            .bind(limit)
            .fetch_all(pool)
            .await?;
    rows.into_iter().map(PredictionRow::into_prediction).collect()
}

/// Unresolved rows awaiting more evidence (not verified, not failed)
pub async fn list_candidates(pool: &SqlitePool, limit: i64) -> StoreResult<Vec<Prediction>> {
    let rows: Vec<PredictionRow> = sqlx::query_as(
        "SELECT * FROM predictions WHERE status IN ('predicted', 'candidate') \
         ORDER BY game_number DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(PredictionRow::into_prediction).collect()
}

/// Everything not yet verified, failed rows included; the verification
/// cycle retries these
pub async fn list_unverified(pool: &SqlitePool, limit: i64) -> StoreResult<Vec<Prediction>> {
    let rows: Vec<PredictionRow> = sqlx::query_as(
        "SELECT * FROM predictions WHERE status != 'verified' \
         ORDER BY game_number DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(PredictionRow::into_prediction).collect()
}

/// Aggregate statistics over the prediction table
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub total: i64,
    pub verified: i64,
    pub unresolved: i64,
    pub failed: i64,
    pub average_confidence: f64,
}

pub async fn stats(pool: &SqlitePool) -> StoreResult<StoreStats> {
    let (total, verified, unresolved, failed, average_confidence): (i64, i64, i64, i64, f64) =
        sqlx::query_as(
            "SELECT
                COUNT(*),
                COALESCE(SUM(status = 'verified'), 0),
                COALESCE(SUM(status IN ('predicted', 'candidate')), 0),
                COALESCE(SUM(status = 'failed'), 0),
                COALESCE(AVG(confidence_score), 0.0)
             FROM predictions",
        )
        .fetch_one(pool)
        .await?;

    Ok(StoreStats {
        total,
        verified,
        unresolved,
        failed,
        average_confidence,
    })
}
