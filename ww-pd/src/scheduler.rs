//! Pipeline scheduler
//!
//! Drives three task types: daily collection, hourly verification, and
//! on-demand historical backfill. A single logical instance: `start` while
//! running is a no-op that reports current status. Per-type gates keep two
//! runs of the same task type from overlapping (scheduled loops await each
//! run inline; the gates also cover manual triggers), while different task
//! types run concurrently.

use crate::collectors::chain::{first_success, CollectorChain};
use crate::hints;
use crate::models::PredictionStatus;
use crate::store::{self, overrides, PredictionUpsert, StoreResult};
use crate::types::{CollectionResult, TaskRecord, TaskType};
use crate::verifier::{self, VerificationOutcome, VerifyError};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use ww_common::calendar;

/// Why a collect-and-verify cycle produced no stored outcome: the consensus
/// rule failed, or the outcome could not be persisted.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Verify(#[from] VerifyError),
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub daily_interval: Duration,
    pub verify_interval: Duration,
    /// Only predictions within this many days are re-verified hourly
    pub verification_window_days: i64,
    /// Delay between backfill requests, to respect source rate limits
    pub backfill_delay: Duration,
    /// Bounded task history, oldest evicted first
    pub history_limit: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            daily_interval: Duration::from_secs(24 * 3600),
            verify_interval: Duration::from_secs(3600),
            verification_window_days: 7,
            backfill_delay: Duration::from_millis(1500),
            history_limit: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub running: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub tasks_recorded: usize,
}

pub struct PipelineScheduler {
    db: SqlitePool,
    chain: Arc<CollectorChain>,
    config: SchedulerConfig,
    running: AtomicBool,
    started_at: RwLock<Option<DateTime<Utc>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    history: RwLock<VecDeque<TaskRecord>>,
    daily_gate: Mutex<()>,
    verify_gate: Mutex<()>,
    backfill_gate: Mutex<()>,
    /// Most recent fan-out results per game number, consumed by manual
    /// verification so operators can re-check without a fresh fetch
    last_results: RwLock<HashMap<i64, Vec<CollectionResult>>>,
}

impl PipelineScheduler {
    pub fn new(db: SqlitePool, chain: Arc<CollectorChain>, config: SchedulerConfig) -> Self {
        Self {
            db,
            chain,
            config,
            running: AtomicBool::new(false),
            started_at: RwLock::new(None),
            handles: Mutex::new(Vec::new()),
            history: RwLock::new(VecDeque::new()),
            daily_gate: Mutex::new(()),
            verify_gate: Mutex::new(()),
            backfill_gate: Mutex::new(()),
            last_results: RwLock::new(HashMap::new()),
        }
    }

    /// Start the periodic loops. Calling this while already running is a
    /// no-op that reports current status rather than double-scheduling.
    pub async fn start(self: &Arc<Self>) -> SchedulerStatus {
        if self.running.swap(true, Ordering::SeqCst) {
            info!("Scheduler already running, start request ignored");
            return self.status().await;
        }

        *self.started_at.write().await = Some(Utc::now());

        let daily = Arc::clone(self);
        let daily_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(daily.config.daily_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !daily.running.load(Ordering::SeqCst) {
                    break;
                }
                daily.run_daily_collection().await;
            }
        });

        let verify = Arc::clone(self);
        let verify_handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(verify.config.verify_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Skip the immediate first tick; daily collection covers startup
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !verify.running.load(Ordering::SeqCst) {
                    break;
                }
                verify.run_hourly_verification().await;
            }
        });

        self.handles
            .lock()
            .await
            .extend([daily_handle, verify_handle]);

        info!("Scheduler started");
        self.status().await
    }

    pub async fn stop(&self) -> SchedulerStatus {
        if self.running.swap(false, Ordering::SeqCst) {
            for handle in self.handles.lock().await.drain(..) {
                handle.abort();
            }
            *self.started_at.write().await = None;
            info!("Scheduler stopped");
        }
        self.status().await
    }

    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.running.load(Ordering::SeqCst),
            started_at: *self.started_at.read().await,
            tasks_recorded: self.history.read().await.len(),
        }
    }

    /// Task history, most recent first
    pub async fn history(&self) -> Vec<TaskRecord> {
        self.history.read().await.iter().cloned().collect()
    }

    async fn record(&self, record: TaskRecord) {
        let mut history = self.history.write().await;
        history.push_front(record);
        while history.len() > self.config.history_limit {
            history.pop_back();
        }
    }

    /// Recorded fan-out results for a game number, if any cycle has run
    pub async fn recorded_results(&self, game_number: i64) -> Vec<CollectionResult> {
        self.last_results
            .read()
            .await
            .get(&game_number)
            .cloned()
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Daily collection
    // ------------------------------------------------------------------

    /// Resolve today's date candidates and collect the first one that
    /// yields an answer. Consults the override store before the network.
    pub async fn run_daily_collection(&self) -> TaskRecord {
        let Ok(_gate) = self.daily_gate.try_lock() else {
            return TaskRecord::started(TaskType::DailyCollection)
                .finish_err("skipped: previous daily collection still running");
        };

        let record = TaskRecord::started(TaskType::DailyCollection);
        let result = self.daily_collection_body().await;

        let record = match result {
            Ok(summary) => {
                info!(task = "daily_collection", %summary, "Task finished");
                record.finish_ok(summary)
            }
            Err(e) => {
                error!(task = "daily_collection", error = %e, "Task failed");
                record.finish_err(e)
            }
        };
        self.record(record.clone()).await;
        record
    }

    async fn daily_collection_body(&self) -> Result<String, String> {
        let candidates = calendar::today_candidates(Utc::now());

        for date in &candidates {
            // Operator override wins over live collection
            match overrides::get_override_by_date(&self.db, *date).await {
                Ok(Some(ov)) => {
                    let input = PredictionUpsert {
                        game_number: ov.game_number,
                        date: ov.date,
                        word: Some(ov.word.clone()),
                        status: PredictionStatus::Verified,
                        confidence: 1.0,
                        sources: vec!["override".to_string()],
                        hints: Some(hints::derive_hints(&ov.word)),
                    };
                    store::upsert_prediction(&self.db, &input)
                        .await
                        .map_err(|e| e.to_string())?;
                    return Ok(format!(
                        "game {} answered from override store",
                        ov.game_number
                    ));
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Override lookup failed, continuing"),
            }

            let results = self.chain.collect_first(*date).await;
            // A success flag without its payload is treated as a miss
            let hit = results.iter().find_map(|r| {
                match (r.success, r.game_number, r.word.as_deref()) {
                    (true, Some(game_number), Some(word)) => {
                        Some((game_number, word.to_string(), r.source_id.clone(), r.date))
                    }
                    _ => None,
                }
            });
            if let Some((game_number, word, source_id, hit_date)) = hit {
                let input = PredictionUpsert {
                    game_number,
                    date: hit_date.unwrap_or(*date),
                    word: Some(word.clone()),
                    status: PredictionStatus::Predicted,
                    confidence: verifier::SINGLE_SOURCE_CONFIDENCE,
                    sources: vec![source_id.clone()],
                    hints: Some(hints::derive_hints(&word)),
                };
                store::upsert_prediction(&self.db, &input)
                    .await
                    .map_err(|e| e.to_string())?;
                self.last_results
                    .write()
                    .await
                    .insert(game_number, results.clone());
                return Ok(format!(
                    "game {} predicted {} from {}",
                    game_number, word, source_id
                ));
            }
        }

        // Every candidate date failed: mark the most likely game failed so
        // the next cycle retries it
        let date = candidates
            .first()
            .copied()
            .ok_or_else(|| "no date candidates resolved".to_string())?;
        let game_number = calendar::game_number(date).map_err(|e| e.to_string())?;
        let input = PredictionUpsert {
            game_number,
            date,
            word: None,
            status: PredictionStatus::Failed,
            confidence: 0.0,
            sources: Vec::new(),
            hints: None,
        };
        store::upsert_prediction(&self.db, &input)
            .await
            .map_err(|e| e.to_string())?;
        Err(format!(
            "no data available for game {} from any source",
            game_number
        ))
    }

    // ------------------------------------------------------------------
    // Hourly verification
    // ------------------------------------------------------------------

    /// Re-verify unresolved predictions in the recent window using fan-out
    /// collection and the consensus rule.
    pub async fn run_hourly_verification(&self) -> TaskRecord {
        let Ok(_gate) = self.verify_gate.try_lock() else {
            return TaskRecord::started(TaskType::HourlyVerification)
                .finish_err("skipped: previous verification still running");
        };

        let record = TaskRecord::started(TaskType::HourlyVerification);
        let result = self.verification_body().await;

        let record = match result {
            Ok(summary) => {
                info!(task = "hourly_verification", %summary, "Task finished");
                record.finish_ok(summary)
            }
            Err(e) => {
                error!(task = "hourly_verification", error = %e, "Task failed");
                record.finish_err(e)
            }
        };
        self.record(record.clone()).await;
        record
    }

    async fn verification_body(&self) -> Result<String, String> {
        let cutoff = Utc::now().date_naive()
            - ChronoDuration::days(self.config.verification_window_days);

        let unresolved = store::list_unverified(&self.db, 500)
            .await
            .map_err(|e| e.to_string())?;
        let in_window: Vec<_> = unresolved
            .into_iter()
            .filter(|p| p.date >= cutoff)
            .collect();

        let mut verified = 0usize;
        let mut still_open = 0usize;
        let mut failed = 0usize;

        for prediction in &in_window {
            match self.collect_and_verify(prediction.date).await {
                Ok(outcome) => {
                    if outcome.verified {
                        verified += 1;
                    } else {
                        still_open += 1;
                    }
                }
                Err(TaskError::Verify(VerifyError::NoDataAvailable)) => {
                    failed += 1;
                    if let Err(e) = store::update_status(
                        &self.db,
                        prediction.game_number,
                        PredictionStatus::Failed,
                        false,
                    )
                    .await
                    {
                        warn!(game_number = prediction.game_number, error = %e,
                            "Could not mark prediction failed");
                    }
                }
                Err(TaskError::Store(e)) => {
                    return Err(format!("game {}: {}", prediction.game_number, e));
                }
                Err(TaskError::Verify(e @ VerifyError::GameNumberMismatch { .. })) => {
                    // Data-integrity anomaly: surface it, keep the row open
                    error!(game_number = prediction.game_number, error = %e,
                        "Game number mismatch across agreeing sources");
                    still_open += 1;
                    if prediction.status == PredictionStatus::Predicted {
                        let _ = store::update_status(
                            &self.db,
                            prediction.game_number,
                            PredictionStatus::Candidate,
                            false,
                        )
                        .await;
                    }
                }
            }
        }

        Ok(format!(
            "{} checked: {} verified, {} still open, {} failed",
            in_window.len(),
            verified,
            still_open,
            failed
        ))
    }

    /// Fan-out collection for one date, consensus, and store update.
    /// Records the raw results for later manual verification. A persistence
    /// failure is an error, never a silently dropped outcome.
    async fn collect_and_verify(
        &self,
        date: NaiveDate,
    ) -> Result<VerificationOutcome, TaskError> {
        let results = self.chain.collect_all(date).await;

        if let Some(hit) = first_success(&results) {
            if let Some(game_number) = hit.game_number {
                self.last_results
                    .write()
                    .await
                    .insert(game_number, results.clone());
            }
        }

        let outcome = verifier::verify(&results)?;
        apply_outcome(&self.db, date, &outcome).await?;
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Backfill
    // ------------------------------------------------------------------

    /// Collect a historical game-number range, oldest first, with an
    /// inter-request delay. Idempotent: verified rows are skipped and
    /// upserts never duplicate.
    pub async fn run_backfill(&self, start: i64, end: i64) -> TaskRecord {
        let Ok(_gate) = self.backfill_gate.try_lock() else {
            return TaskRecord::started(TaskType::Backfill)
                .finish_err("skipped: previous backfill still running");
        };

        let record = TaskRecord::started(TaskType::Backfill);
        let result = self.backfill_body(start, end).await;

        let record = match result {
            Ok(summary) => {
                info!(task = "backfill", %summary, "Task finished");
                record.finish_ok(summary)
            }
            Err(e) => {
                error!(task = "backfill", error = %e, "Task failed");
                record.finish_err(e)
            }
        };
        self.record(record.clone()).await;
        record
    }

    async fn backfill_body(&self, start: i64, end: i64) -> Result<String, String> {
        if start > end {
            return Err(format!("invalid range: {} > {}", start, end));
        }

        let mut collected = 0usize;
        let mut verified = 0usize;
        let mut skipped = 0usize;
        let mut failed = 0usize;

        for game_number in start..=end {
            if game_number > start {
                tokio::time::sleep(self.config.backfill_delay).await;
            }

            // Already-verified rows need no further evidence
            match store::get_by_game_number(&self.db, game_number).await {
                Ok(Some(p)) if p.status == PredictionStatus::Verified => {
                    skipped += 1;
                    continue;
                }
                Ok(_) => {}
                Err(e) => return Err(e.to_string()),
            }

            let date = calendar::date_for_game(game_number).map_err(|e| e.to_string())?;
            match self.collect_and_verify(date).await {
                Ok(outcome) => {
                    collected += 1;
                    if outcome.verified {
                        verified += 1;
                    }
                }
                Err(TaskError::Verify(VerifyError::NoDataAvailable)) => {
                    failed += 1;
                    let input = PredictionUpsert {
                        game_number,
                        date,
                        word: None,
                        status: PredictionStatus::Failed,
                        confidence: 0.0,
                        sources: Vec::new(),
                        hints: None,
                    };
                    store::upsert_prediction(&self.db, &input)
                        .await
                        .map_err(|e| e.to_string())?;
                }
                Err(TaskError::Verify(e @ VerifyError::GameNumberMismatch { .. })) => {
                    error!(game_number, error = %e, "Game number mismatch during backfill");
                    failed += 1;
                }
                Err(TaskError::Store(e)) => {
                    return Err(format!("game {}: {}", game_number, e));
                }
            }
        }

        Ok(format!(
            "{} games collected ({} verified), {} skipped, {} failed",
            collected, verified, skipped, failed
        ))
    }

    // ------------------------------------------------------------------
    // Manual verification
    // ------------------------------------------------------------------

    /// Re-run the agreement rule for one game number against previously
    /// recorded results, restricted to the supplied sources. No network.
    pub async fn verify_manual(
        &self,
        game_number: i64,
        source_ids: &[String],
    ) -> Result<VerificationOutcome, TaskError> {
        let recorded = self.recorded_results(game_number).await;
        let outcome = verifier::verify_manual(game_number, source_ids, &recorded)?;

        if let Some(date) = recorded.iter().find_map(|r| r.date) {
            apply_outcome(&self.db, date, &outcome).await?;
        }
        Ok(outcome)
    }
}

/// Persist a verification outcome: verified consensus or open candidate
pub async fn apply_outcome(
    pool: &SqlitePool,
    date: NaiveDate,
    outcome: &VerificationOutcome,
) -> StoreResult<()> {
    let status = if outcome.verified {
        PredictionStatus::Verified
    } else {
        PredictionStatus::Candidate
    };
    let input = PredictionUpsert {
        game_number: outcome.game_number,
        date,
        word: Some(outcome.word.clone()),
        status,
        confidence: outcome.confidence,
        sources: outcome.sources.clone(),
        hints: Some(hints::derive_hints(&outcome.word)),
    };
    store::upsert_prediction(pool, &input).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::Collector;
    use crate::types::CollectError;
    use async_trait::async_trait;
    use ww_common::db::init::init_memory_database;

    /// Answers with a word derived from the requested date so backfilled
    /// games stay distinguishable, or fails when `word` is None.
    struct StubCollector {
        id: &'static str,
        priority: u32,
        word: Option<&'static str>,
    }

    #[async_trait]
    impl Collector for StubCollector {
        fn source_id(&self) -> &str {
            self.id
        }
        fn priority(&self) -> u32 {
            self.priority
        }
        async fn collect(&self, date: NaiveDate) -> CollectionResult {
            match self.word {
                Some(word) => {
                    let game = calendar::game_number(date).unwrap();
                    CollectionResult::success(self.id, game, word.to_string(), date)
                }
                None => CollectionResult::failure(self.id, CollectError::Http(500)),
            }
        }
    }

    fn chain(specs: &[(&'static str, u32, Option<&'static str>)]) -> Arc<CollectorChain> {
        let collectors = specs
            .iter()
            .map(|(id, priority, word)| {
                Arc::new(StubCollector {
                    id: *id,
                    priority: *priority,
                    word: *word,
                }) as Arc<dyn Collector>
            })
            .collect();
        Arc::new(CollectorChain::new(collectors, Duration::from_secs(5)))
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            backfill_delay: Duration::from_millis(1),
            ..Default::default()
        }
    }

    async fn scheduler(
        specs: &[(&'static str, u32, Option<&'static str>)],
    ) -> (Arc<PipelineScheduler>, SqlitePool) {
        let pool = init_memory_database().await.unwrap();
        let sched = Arc::new(PipelineScheduler::new(
            pool.clone(),
            chain(specs),
            fast_config(),
        ));
        (sched, pool)
    }

    #[tokio::test]
    async fn backfill_inserts_each_game_once() {
        let (sched, pool) = scheduler(&[
            ("nyt", 0, Some("IMBUE")),
            ("tomsguide", 1, Some("IMBUE")),
            ("wordtips", 2, Some("OTHER")),
        ])
        .await;

        let record = sched.run_backfill(1500, 1502).await;
        assert!(record.error.is_none(), "{:?}", record.error);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 3);

        for game in 1500..=1502 {
            let p = store::get_by_game_number(&pool, game).await.unwrap().unwrap();
            // 2 of 3 agree on IMBUE
            assert_eq!(p.status, PredictionStatus::Verified);
            assert_eq!(p.verified_word.as_deref(), Some("IMBUE"));
        }

        // Re-run: no duplicates, verified rows skipped
        let record = sched.run_backfill(1500, 1502).await;
        assert!(record.outcome.as_deref().unwrap().contains("3 skipped"));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 3);
    }

    #[tokio::test]
    async fn backfill_single_source_yields_candidate() {
        let (sched, pool) = scheduler(&[("nyt", 0, Some("NOMAD")), ("tomsguide", 1, None)]).await;

        sched.run_backfill(1510, 1510).await;

        let p = store::get_by_game_number(&pool, 1510).await.unwrap().unwrap();
        assert_eq!(p.status, PredictionStatus::Candidate);
        assert_eq!(p.predicted_word.as_deref(), Some("NOMAD"));
        assert!(p.confidence_score < verifier::VERIFICATION_THRESHOLD);
    }

    #[tokio::test]
    async fn backfill_all_sources_failing_marks_failed() {
        let (sched, pool) = scheduler(&[("nyt", 0, None), ("tomsguide", 1, None)]).await;

        sched.run_backfill(1520, 1520).await;

        let p = store::get_by_game_number(&pool, 1520).await.unwrap().unwrap();
        assert_eq!(p.status, PredictionStatus::Failed);
        assert!(p.predicted_word.is_none());
    }

    #[tokio::test]
    async fn backfill_rejects_inverted_range() {
        let (sched, _pool) = scheduler(&[("nyt", 0, Some("IMBUE"))]).await;
        let record = sched.run_backfill(10, 5).await;
        assert!(record.error.is_some());
    }

    #[tokio::test]
    async fn daily_collection_prefers_override_store() {
        let (sched, pool) = scheduler(&[("nyt", 0, Some("WRONG"))]).await;

        let today = calendar::today_candidates(Utc::now())[0];
        let game = calendar::game_number(today).unwrap();
        overrides::upsert_override(&pool, game, today, "IMBUE")
            .await
            .unwrap();

        let record = sched.run_daily_collection().await;
        assert!(record.error.is_none());
        assert!(record.outcome.as_deref().unwrap().contains("override"));

        let p = store::get_by_game_number(&pool, game).await.unwrap().unwrap();
        assert_eq!(p.verified_word.as_deref(), Some("IMBUE"));
        assert_eq!(p.status, PredictionStatus::Verified);
    }

    #[tokio::test]
    async fn daily_collection_upserts_predicted_row() {
        let (sched, pool) = scheduler(&[("nyt", 0, Some("NOMAD"))]).await;

        let record = sched.run_daily_collection().await;
        assert!(record.error.is_none(), "{:?}", record.error);

        let p = store::get_latest(&pool).await.unwrap().unwrap();
        assert_eq!(p.status, PredictionStatus::Predicted);
        assert_eq!(p.predicted_word.as_deref(), Some("NOMAD"));
        assert_eq!(p.verification_sources, vec!["nyt".to_string()]);
        assert!(p.hints.is_some());
    }

    #[tokio::test]
    async fn daily_collection_failure_marks_game_failed() {
        let (sched, pool) = scheduler(&[("nyt", 0, None)]).await;

        let record = sched.run_daily_collection().await;
        assert!(record.error.is_some());

        let p = store::get_latest(&pool).await.unwrap().unwrap();
        assert_eq!(p.status, PredictionStatus::Failed);
    }

    #[tokio::test]
    async fn verification_resolves_open_candidates() {
        let (sched, pool) = scheduler(&[
            ("nyt", 0, Some("IMBUE")),
            ("tomsguide", 1, Some("IMBUE")),
        ])
        .await;

        // Seed an unverified row for a recent date
        let today = Utc::now().date_naive();
        let game = calendar::game_number(today).unwrap();
        store::upsert_prediction(
            &pool,
            &PredictionUpsert {
                game_number: game,
                date: today,
                word: Some("IMBUE".to_string()),
                status: PredictionStatus::Predicted,
                confidence: 0.4,
                sources: vec!["nyt".to_string()],
                hints: None,
            },
        )
        .await
        .unwrap();

        let record = sched.run_hourly_verification().await;
        assert!(record.error.is_none());

        let p = store::get_by_game_number(&pool, game).await.unwrap().unwrap();
        assert_eq!(p.status, PredictionStatus::Verified);
        assert_eq!(p.confidence_score, 1.0);
    }

    #[tokio::test]
    async fn start_twice_is_a_noop() {
        let (sched, _pool) = scheduler(&[("nyt", 0, Some("IMBUE"))]).await;

        let first = sched.start().await;
        assert!(first.running);
        let second = sched.start().await;
        assert!(second.running);

        // Only one pair of loops was spawned
        assert_eq!(sched.handles.lock().await.len(), 2);

        let stopped = sched.stop().await;
        assert!(!stopped.running);
    }

    #[tokio::test]
    async fn history_is_bounded_most_recent_first() {
        let (sched, _pool) = scheduler(&[("nyt", 0, Some("IMBUE"))]).await;

        for _ in 0..60 {
            sched.run_daily_collection().await;
        }

        let history = sched.history().await;
        assert_eq!(history.len(), sched.config.history_limit);
        // Most recent first: every record newer than or equal to the next
        for pair in history.windows(2) {
            assert!(pair[0].started_at >= pair[1].started_at);
        }
    }

    #[tokio::test]
    async fn manual_verification_uses_recorded_results() {
        let (sched, pool) = scheduler(&[
            ("nyt", 0, Some("IMBUE")),
            ("tomsguide", 1, Some("IMBUE")),
            ("wordtips", 2, Some("OTHER")),
        ])
        .await;

        sched.run_backfill(1511, 1511).await;

        let outcome = sched
            .verify_manual(1511, &["nyt".to_string(), "tomsguide".to_string()])
            .await
            .unwrap();
        assert!(outcome.verified);
        assert_eq!(outcome.word, "IMBUE");

        // Restricting to a disagreeing pair cannot verify
        let outcome = sched
            .verify_manual(1511, &["nyt".to_string(), "wordtips".to_string()])
            .await
            .unwrap();
        assert!(!outcome.verified);

        let p = store::get_by_game_number(&pool, 1511).await.unwrap().unwrap();
        // Verified earlier; the failed manual recheck must not downgrade it
        assert_eq!(p.status, PredictionStatus::Verified);
    }

    #[tokio::test]
    async fn manual_verification_without_recorded_results_is_no_data() {
        let (sched, _pool) = scheduler(&[("nyt", 0, Some("IMBUE"))]).await;
        let err = sched
            .verify_manual(1511, &["nyt".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TaskError::Verify(VerifyError::NoDataAvailable)
        ));
    }

    /// Reports success but carries no payload. A malformed result must not
    /// take down the daily task.
    struct HollowCollector;

    #[async_trait]
    impl Collector for HollowCollector {
        fn source_id(&self) -> &str {
            "hollow"
        }
        fn priority(&self) -> u32 {
            0
        }
        async fn collect(&self, _date: NaiveDate) -> CollectionResult {
            CollectionResult {
                success: true,
                source_id: "hollow".to_string(),
                game_number: None,
                word: None,
                date: None,
                error: None,
                via: None,
            }
        }
    }

    #[tokio::test]
    async fn daily_collection_skips_payloadless_success() {
        let pool = init_memory_database().await.unwrap();
        let sched = Arc::new(PipelineScheduler::new(
            pool.clone(),
            Arc::new(CollectorChain::new(
                vec![Arc::new(HollowCollector) as Arc<dyn Collector>],
                Duration::from_secs(5),
            )),
            fast_config(),
        ));

        let record = sched.run_daily_collection().await;
        assert!(record.error.is_some());

        let p = store::get_latest(&pool).await.unwrap().unwrap();
        assert_eq!(p.status, PredictionStatus::Failed);
        assert!(p.predicted_word.is_none());
    }

    #[tokio::test]
    async fn verification_surfaces_persistence_failure() {
        let (sched, pool) = scheduler(&[
            ("nyt", 0, Some("IMBUE")),
            ("tomsguide", 1, Some("IMBUE")),
        ])
        .await;

        let today = Utc::now().date_naive();
        let game = calendar::game_number(today).unwrap();
        store::upsert_prediction(
            &pool,
            &PredictionUpsert {
                game_number: game,
                date: today,
                word: Some("IMBUE".to_string()),
                status: PredictionStatus::Predicted,
                confidence: 0.4,
                sources: vec!["nyt".to_string()],
                hints: None,
            },
        )
        .await
        .unwrap();

        // Writes promoting a row to verified are rejected below the store
        // layer, so applying the consensus outcome must fail
        sqlx::query(
            "CREATE TRIGGER reject_verified BEFORE UPDATE ON predictions \
             WHEN NEW.status = 'verified' \
             BEGIN SELECT RAISE(ABORT, 'write rejected'); END",
        )
        .execute(&pool)
        .await
        .unwrap();

        let record = sched.run_hourly_verification().await;
        assert!(record.error.is_some());

        let p = store::get_by_game_number(&pool, game).await.unwrap().unwrap();
        assert_eq!(p.status, PredictionStatus::Predicted);
    }
}
