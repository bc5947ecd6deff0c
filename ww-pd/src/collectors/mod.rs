//! Collectors: one external fetch+parse attempt per source
//!
//! Each collector wraps network I/O plus a parser and returns a uniform
//! `CollectionResult`. Collectors fail closed: no error escapes `collect`,
//! every failure is categorized into `CollectError` inside the result.

pub mod authoritative;
pub mod chain;
pub mod scrape;

pub use authoritative::{AuthoritativeCollector, DirectFetch, FetchStrategy, RelayFetch};
pub use chain::CollectorChain;
pub use scrape::ScrapeCollector;

use crate::types::{CollectError, CollectionResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;

const USER_AGENT: &str = "WordWatch/0.1.0 (answer acquisition pipeline)";

/// One external data source. `collect` never panics and never returns an
/// error type; failures are carried inside the `CollectionResult`.
#[async_trait]
pub trait Collector: Send + Sync {
    /// Stable source identifier (e.g. "nyt", "tomsguide")
    fn source_id(&self) -> &str;

    /// Lower value = higher priority in the chain
    fn priority(&self) -> u32;

    async fn collect(&self, date: NaiveDate) -> CollectionResult;
}

/// Shared HTTP client with user-agent and request timeout applied
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, CollectError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| CollectError::Network(e.to_string()))
}

/// Map a reqwest transport failure onto the collector error taxonomy
pub(crate) fn classify_reqwest_error(e: reqwest::Error) -> CollectError {
    if e.is_timeout() {
        CollectError::Timeout
    } else {
        CollectError::Network(e.to_string())
    }
}
