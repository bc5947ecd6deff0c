//! Database initialization
//!
//! Creates the database file on first run and brings the schema up
//! idempotently on every start. WAL mode is enabled because the scheduler's
//! verification task and the HTTP API can read and write concurrently.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    configure_pragmas(&pool).await?;
    create_schema(&pool).await?;

    Ok(pool)
}

/// In-memory database with full schema, for tests and ephemeral runs
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePool::connect(":memory:").await?;
    create_schema(&pool).await?;
    Ok(pool)
}

async fn configure_pragmas(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(pool).await?;

    Ok(())
}

/// Create all tables (idempotent, safe to call on every start)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_predictions_table(pool).await?;
    create_answer_overrides_table(pool).await?;
    Ok(())
}

/// Predictions table: one row per game number
///
/// `game_number` is the unique key; `date` carries a secondary index for
/// date-keyed lookups. `verification_sources` and `hints` are JSON columns.
async fn create_predictions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS predictions (
            game_number          INTEGER PRIMARY KEY,
            date                 TEXT NOT NULL,
            predicted_word       TEXT,
            verified_word        TEXT,
            status               TEXT NOT NULL DEFAULT 'predicted',
            confidence_score     REAL NOT NULL DEFAULT 0.0,
            verification_sources TEXT NOT NULL DEFAULT '[]',
            hints                TEXT,
            created_at           TEXT NOT NULL,
            updated_at           TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_predictions_date ON predictions(date)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_predictions_status ON predictions(status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Answer overrides: operator-supplied answers consulted before live collection
async fn create_answer_overrides_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS answer_overrides (
            game_number INTEGER PRIMARY KEY,
            date        TEXT NOT NULL,
            word        TEXT NOT NULL,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    Ok(())
}
