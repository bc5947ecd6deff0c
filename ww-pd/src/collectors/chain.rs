//! Collector chain: priority-ordered execution with fallback or fan-out
//!
//! Fallback (`collect_first`) tries collectors sequentially and stops at the
//! first success. Fan-out (`collect_all`) queries every collector
//! concurrently and awaits all outcomes, successes and failures alike, so
//! the verifier sees the full picture. Every call carries the chain's
//! timeout; a slow or hanging source is failed individually and never blocks
//! its siblings or the task.

use crate::collectors::Collector;
use crate::types::{CollectError, CollectionResult};
use chrono::NaiveDate;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct CollectorChain {
    collectors: Vec<Arc<dyn Collector>>,
    call_timeout: Duration,
}

impl CollectorChain {
    pub fn new(mut collectors: Vec<Arc<dyn Collector>>, call_timeout: Duration) -> Self {
        collectors.sort_by_key(|c| c.priority());
        Self {
            collectors,
            call_timeout,
        }
    }

    pub fn source_count(&self) -> usize {
        self.collectors.len()
    }

    async fn collect_with_timeout(
        &self,
        collector: &Arc<dyn Collector>,
        date: NaiveDate,
    ) -> CollectionResult {
        match tokio::time::timeout(self.call_timeout, collector.collect(date)).await {
            Ok(result) => result,
            Err(_) => CollectionResult::failure(collector.source_id(), CollectError::Timeout),
        }
    }

    /// Fallback semantics: try collectors in priority order, stop at the
    /// first success. Returns every attempt made, the successful one last.
    pub async fn collect_first(&self, date: NaiveDate) -> Vec<CollectionResult> {
        let mut attempts = Vec::new();

        for collector in &self.collectors {
            let result = self.collect_with_timeout(collector, date).await;
            let succeeded = result.success;
            debug!(
                source = %result.source_id,
                success = succeeded,
                %date,
                "Chain attempt finished"
            );
            attempts.push(result);
            if succeeded {
                break;
            }
        }

        attempts
    }

    /// Fan-out semantics: query all collectors concurrently and await every
    /// outcome. Needed for consensus verification.
    pub async fn collect_all(&self, date: NaiveDate) -> Vec<CollectionResult> {
        let futures = self
            .collectors
            .iter()
            .map(|c| self.collect_with_timeout(c, date));

        futures::future::join_all(futures).await
    }
}

/// First successful result in a batch, if any
pub fn first_success(results: &[CollectionResult]) -> Option<&CollectionResult> {
    results.iter().find(|r| r.success)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubCollector {
        id: &'static str,
        priority: u32,
        word: Option<&'static str>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl StubCollector {
        fn ok(id: &'static str, priority: u32, word: &'static str) -> Arc<Self> {
            Arc::new(Self {
                id,
                priority,
                word: Some(word),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(id: &'static str, priority: u32) -> Arc<Self> {
            Arc::new(Self {
                id,
                priority,
                word: None,
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            })
        }

        fn hanging(id: &'static str, priority: u32) -> Arc<Self> {
            Arc::new(Self {
                id,
                priority,
                word: Some("IMBUE"),
                delay: Duration::from_secs(60),
                calls: AtomicUsize::new(0),
            })
        }
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
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            match self.word {
                Some(word) => CollectionResult::success(self.id, 1511, word.to_string(), date),
                None => CollectionResult::failure(self.id, CollectError::Http(500)),
            }
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 8).unwrap()
    }

    #[tokio::test]
    async fn fallback_stops_at_first_success() {
        let a = StubCollector::failing("a", 0);
        let b = StubCollector::ok("b", 1, "IMBUE");
        let c = StubCollector::ok("c", 2, "IMBUE");
        let chain = CollectorChain::new(
            vec![
                a.clone() as Arc<dyn Collector>,
                b.clone() as Arc<dyn Collector>,
                c.clone() as Arc<dyn Collector>,
            ],
            Duration::from_secs(5),
        );

        let results = chain.collect_first(date()).await;

        assert_eq!(results.len(), 2);
        assert!(!results[0].success);
        assert!(results[1].success);
        assert_eq!(results[1].source_id, "b");
        assert_eq!(c.calls.load(Ordering::SeqCst), 0, "c must not be queried");
    }

    #[tokio::test]
    async fn fallback_respects_priority_order_not_insertion_order() {
        let low = StubCollector::ok("low", 5, "IMBUE");
        let high = StubCollector::ok("high", 0, "IMBUE");
        let chain = CollectorChain::new(
            vec![
                low.clone() as Arc<dyn Collector>,
                high.clone() as Arc<dyn Collector>,
            ],
            Duration::from_secs(5),
        );

        let results = chain.collect_first(date()).await;

        assert_eq!(results[0].source_id, "high");
        assert_eq!(low.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn fan_out_returns_every_outcome() {
        let chain = CollectorChain::new(
            vec![
                StubCollector::ok("a", 0, "IMBUE") as Arc<dyn Collector>,
                StubCollector::failing("b", 1) as Arc<dyn Collector>,
                StubCollector::ok("c", 2, "IMBUE") as Arc<dyn Collector>,
            ],
            Duration::from_secs(5),
        );

        let results = chain.collect_all(date()).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| r.success).count(), 2);
        assert_eq!(results.iter().filter(|r| !r.success).count(), 1);
    }

    #[tokio::test]
    async fn hanging_source_times_out_without_blocking_siblings() {
        let chain = CollectorChain::new(
            vec![
                StubCollector::hanging("slow", 0) as Arc<dyn Collector>,
                StubCollector::ok("fast", 1, "IMBUE") as Arc<dyn Collector>,
            ],
            Duration::from_millis(100),
        );

        let start = std::time::Instant::now();
        let results = chain.collect_all(date()).await;
        assert!(start.elapsed() < Duration::from_secs(5));

        let slow = results.iter().find(|r| r.source_id == "slow").unwrap();
        assert_eq!(slow.error, Some(CollectError::Timeout));

        let fast = results.iter().find(|r| r.source_id == "fast").unwrap();
        assert!(fast.success);
    }

    #[tokio::test]
    async fn all_failures_yield_no_success() {
        let chain = CollectorChain::new(
            vec![
                StubCollector::failing("a", 0) as Arc<dyn Collector>,
                StubCollector::failing("b", 1) as Arc<dyn Collector>,
            ],
            Duration::from_secs(5),
        );
        let results = chain.collect_first(date()).await;
        assert!(first_success(&results).is_none());
        assert_eq!(results.len(), 2);
    }
}
