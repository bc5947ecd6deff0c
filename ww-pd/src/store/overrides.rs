//! Override store: operator-supplied answers consulted before live collection
//!
//! A small keyed table with the same upsert contract as the prediction
//! store. Replaces any notion of hard-coded date-to-word fallback maps: an
//! emergency answer is a row an operator writes, not a process-wide
//! constant.

use super::{StoreError, StoreResult};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AnswerOverride {
    pub game_number: i64,
    pub date: NaiveDate,
    pub word: String,
}

pub async fn upsert_override(
    pool: &SqlitePool,
    game_number: i64,
    date: NaiveDate,
    word: &str,
) -> StoreResult<()> {
    let now = Utc::now().to_rfc3339();
    sqlx::query(
        "INSERT INTO answer_overrides (game_number, date, word, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?)
         ON CONFLICT(game_number) DO UPDATE SET
            date = excluded.date,
            word = excluded.word,
            updated_at = excluded.updated_at",
    )
    .bind(game_number)
    .bind(date.format("%Y-%m-%d").to_string())
    .bind(word)
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_override(
    pool: &SqlitePool,
    game_number: i64,
) -> StoreResult<Option<AnswerOverride>> {
    let row: Option<(i64, String, String)> = sqlx::query_as(
        "SELECT game_number, date, word FROM answer_overrides WHERE game_number = ?",
    )
    .bind(game_number)
    .fetch_optional(pool)
    .await?;
    row.map(row_to_override).transpose()
}

pub async fn get_override_by_date(
    pool: &SqlitePool,
    date: NaiveDate,
) -> StoreResult<Option<AnswerOverride>> {
    let row: Option<(i64, String, String)> = sqlx::query_as(
        "SELECT game_number, date, word FROM answer_overrides WHERE date = ?",
    )
    .bind(date.format("%Y-%m-%d").to_string())
    .fetch_optional(pool)
    .await?;
    row.map(row_to_override).transpose()
}

fn row_to_override((game_number, date, word): (i64, String, String)) -> StoreResult<AnswerOverride> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|e| StoreError::Corrupt(format!("override date {:?}: {}", date, e)))?;
    Ok(AnswerOverride {
        game_number,
        date,
        word,
    })
}
