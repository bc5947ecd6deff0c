//! Authoritative collector with fallback ladder
//!
//! The primary feed is a date-keyed JSON endpoint. It may be unreachable
//! from some network environments, so the collector composes pluggable fetch
//! strategies into a ladder: a direct connection first, then content-fetching
//! relays that proxy the same request. Rungs run sequentially in priority
//! order and the first success wins, attributed in the result's `via` field.
//!
//! Every rung's payload goes through the same validation. A relay is not
//! trusted to have validated anything.

use crate::collectors::{classify_reqwest_error, Collector};
use crate::types::{CollectError, CollectionResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

pub const SOURCE_ID: &str = "nyt";
const DEFAULT_BASE_URL: &str = "https://www.nytimes.com/svc/wordle/v2";

/// Expected body shape of the authoritative feed.
///
/// Every field is required: a response missing the numeric identifier or the
/// solution is a parse failure, not a success with null data.
#[derive(Debug, Deserialize)]
struct FeedResponse {
    id: i64,
    solution: String,
    print_date: String,
    days_since_launch: i64,
    #[allow(dead_code)]
    editor: Option<String>,
}

/// Validated payload extracted from a feed response
#[derive(Debug, PartialEq)]
pub struct FeedAnswer {
    pub game_number: i64,
    pub word: String,
    pub date: NaiveDate,
}

/// Parse and validate a feed body regardless of which rung fetched it
pub fn parse_feed_body(body: &str) -> Result<FeedAnswer, CollectError> {
    let response: FeedResponse = serde_json::from_str(body)
        .map_err(|e| CollectError::Parse(format!("feed body: {}", e)))?;

    if response.id < 0 || response.days_since_launch < 0 {
        return Err(CollectError::Parse(format!(
            "negative identifier (id={}, days_since_launch={})",
            response.id, response.days_since_launch
        )));
    }

    let solution = response.solution.trim();
    if solution.len() != 5 || !solution.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(CollectError::Parse(format!(
            "solution {:?} is not a 5-letter word",
            response.solution
        )));
    }

    let date = NaiveDate::parse_from_str(&response.print_date, "%Y-%m-%d")
        .map_err(|e| CollectError::Parse(format!("print_date {:?}: {}", response.print_date, e)))?;

    Ok(FeedAnswer {
        // days_since_launch is the canonical game number
        game_number: response.days_since_launch,
        word: solution.to_ascii_uppercase(),
        date,
    })
}

/// One rung of the fallback ladder: a way to fetch the feed body for a date
#[async_trait]
pub trait FetchStrategy: Send + Sync {
    /// Rung name used for success attribution (e.g. "direct", "relay:jina")
    fn name(&self) -> &str;

    async fn fetch(&self, client: &reqwest::Client, date: NaiveDate)
        -> Result<String, CollectError>;
}

fn feed_url(base_url: &str, date: NaiveDate) -> String {
    format!("{}/{}.json", base_url, date.format("%Y-%m-%d"))
}

async fn fetch_body(client: &reqwest::Client, url: &str) -> Result<String, CollectError> {
    let response = client.get(url).send().await.map_err(classify_reqwest_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(CollectError::Http(status.as_u16()));
    }

    response.text().await.map_err(classify_reqwest_error)
}

/// Direct connection to the feed
pub struct DirectFetch {
    base_url: String,
}

impl DirectFetch {
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for DirectFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchStrategy for DirectFetch {
    fn name(&self) -> &str {
        "direct"
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        date: NaiveDate,
    ) -> Result<String, CollectError> {
        fetch_body(client, &feed_url(&self.base_url, date)).await
    }
}

/// Content-fetching relay that proxies the feed request.
///
/// The template contains a `{url}` placeholder replaced with the feed URL.
pub struct RelayFetch {
    name: String,
    template: String,
    base_url: String,
}

impl RelayFetch {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[async_trait]
impl FetchStrategy for RelayFetch {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(
        &self,
        client: &reqwest::Client,
        date: NaiveDate,
    ) -> Result<String, CollectError> {
        let target = feed_url(&self.base_url, date);
        let url = self.template.replace("{url}", &target);
        fetch_body(client, &url).await
    }
}

/// The authoritative collector: fetch strategies composed into a ladder
pub struct AuthoritativeCollector {
    client: reqwest::Client,
    strategies: Vec<Box<dyn FetchStrategy>>,
}

impl AuthoritativeCollector {
    /// Direct rung plus one relay rung per configured template, in order
    pub fn new(client: reqwest::Client, relay_templates: &[String]) -> Self {
        let mut strategies: Vec<Box<dyn FetchStrategy>> = vec![Box::new(DirectFetch::new())];
        for (i, template) in relay_templates.iter().enumerate() {
            strategies.push(Box::new(RelayFetch::new(
                format!("relay:{}", i + 1),
                template.clone(),
            )));
        }
        Self { client, strategies }
    }

    /// Explicit ladder, used by tests and custom deployments
    pub fn with_strategies(
        client: reqwest::Client,
        strategies: Vec<Box<dyn FetchStrategy>>,
    ) -> Self {
        Self { client, strategies }
    }
}

#[async_trait]
impl Collector for AuthoritativeCollector {
    fn source_id(&self) -> &str {
        SOURCE_ID
    }

    fn priority(&self) -> u32 {
        0
    }

    async fn collect(&self, date: NaiveDate) -> CollectionResult {
        let mut last_error = CollectError::Network("no fetch strategies configured".to_string());

        for strategy in &self.strategies {
            debug!(rung = strategy.name(), %date, "Trying authoritative rung");
            match strategy.fetch(&self.client, date).await {
                Ok(body) => match parse_feed_body(&body) {
                    Ok(answer) => {
                        debug!(
                            rung = strategy.name(),
                            game_number = answer.game_number,
                            "Authoritative collection succeeded"
                        );
                        return CollectionResult::success(
                            SOURCE_ID,
                            answer.game_number,
                            answer.word,
                            answer.date,
                        )
                        .via(strategy.name());
                    }
                    Err(e) => {
                        warn!(rung = strategy.name(), error = %e, "Rung returned invalid payload");
                        last_error = e;
                    }
                },
                Err(e) => {
                    warn!(rung = strategy.name(), error = %e, "Rung fetch failed");
                    last_error = e;
                }
            }
        }

        CollectionResult::failure(SOURCE_ID, last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn test_client() -> reqwest::Client {
        crate::collectors::build_http_client(Duration::from_secs(5)).unwrap()
    }

    struct FixedBody(&'static str, &'static str);

    #[async_trait]
    impl FetchStrategy for FixedBody {
        fn name(&self) -> &str {
            self.0
        }
        async fn fetch(
            &self,
            _client: &reqwest::Client,
            _date: NaiveDate,
        ) -> Result<String, CollectError> {
            Ok(self.1.to_string())
        }
    }

    struct AlwaysFails(&'static str, CollectError);

    #[async_trait]
    impl FetchStrategy for AlwaysFails {
        fn name(&self) -> &str {
            self.0
        }
        async fn fetch(
            &self,
            _client: &reqwest::Client,
            _date: NaiveDate,
        ) -> Result<String, CollectError> {
            Err(self.1.clone())
        }
    }

    const NOMAD_BODY: &str = r#"{
        "id": 1516,
        "solution": "nomad",
        "print_date": "2025-08-12",
        "days_since_launch": 1516,
        "editor": "Tracy Bennett"
    }"#;

    #[test]
    fn valid_feed_body_parses_and_uppercases() {
        let answer = parse_feed_body(NOMAD_BODY).unwrap();
        assert_eq!(answer.game_number, 1516);
        assert_eq!(answer.word, "NOMAD");
        assert_eq!(answer.date, NaiveDate::from_ymd_opt(2025, 8, 12).unwrap());
    }

    #[test]
    fn missing_solution_is_parse_failure() {
        let body = r#"{"id": 1516, "print_date": "2025-08-12", "days_since_launch": 1516}"#;
        assert!(matches!(
            parse_feed_body(body),
            Err(CollectError::Parse(_))
        ));
    }

    #[test]
    fn missing_id_is_parse_failure() {
        let body = r#"{"solution": "nomad", "print_date": "2025-08-12", "days_since_launch": 1516}"#;
        assert!(matches!(
            parse_feed_body(body),
            Err(CollectError::Parse(_))
        ));
    }

    #[test]
    fn six_letter_solution_is_parse_failure() {
        let body = r#"{"id": 1, "solution": "nomads", "print_date": "2025-08-12", "days_since_launch": 1}"#;
        assert!(matches!(
            parse_feed_body(body),
            Err(CollectError::Parse(_))
        ));
    }

    #[test]
    fn malformed_date_is_parse_failure() {
        let body = r#"{"id": 1, "solution": "nomad", "print_date": "12/08/2025", "days_since_launch": 1}"#;
        assert!(matches!(
            parse_feed_body(body),
            Err(CollectError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn successful_collection_from_feed_shape() {
        let collector = AuthoritativeCollector::with_strategies(
            test_client(),
            vec![Box::new(FixedBody("direct", NOMAD_BODY))],
        );
        let date = NaiveDate::from_ymd_opt(2025, 8, 12).unwrap();
        let result = collector.collect(date).await;

        assert!(result.success);
        assert_eq!(result.source_id, "nyt");
        assert_eq!(result.game_number, Some(1516));
        assert_eq!(result.word.as_deref(), Some("NOMAD"));
        assert_eq!(result.date, Some(date));
        assert_eq!(result.via.as_deref(), Some("direct"));
    }

    #[tokio::test]
    async fn ladder_falls_through_to_relay_and_attributes_it() {
        let collector = AuthoritativeCollector::with_strategies(
            test_client(),
            vec![
                Box::new(AlwaysFails("direct", CollectError::Timeout)),
                Box::new(FixedBody("relay:1", NOMAD_BODY)),
            ],
        );
        let date = NaiveDate::from_ymd_opt(2025, 8, 12).unwrap();
        let result = collector.collect(date).await;

        assert!(result.success);
        assert_eq!(result.via.as_deref(), Some("relay:1"));
        assert_eq!(result.game_number, Some(1516));
        assert_eq!(result.word.as_deref(), Some("NOMAD"));
    }

    #[tokio::test]
    async fn relay_payload_is_revalidated() {
        // Relay "succeeds" but hands back garbage: must be a parse failure,
        // not a trusted success.
        let collector = AuthoritativeCollector::with_strategies(
            test_client(),
            vec![
                Box::new(AlwaysFails("direct", CollectError::Timeout)),
                Box::new(FixedBody("relay:1", r#"{"cached": true}"#)),
            ],
        );
        let result = collector
            .collect(NaiveDate::from_ymd_opt(2025, 8, 12).unwrap())
            .await;

        assert!(!result.success);
        assert!(matches!(result.error, Some(CollectError::Parse(_))));
    }

    #[tokio::test]
    async fn all_rungs_failing_reports_last_error() {
        let collector = AuthoritativeCollector::with_strategies(
            test_client(),
            vec![
                Box::new(AlwaysFails("direct", CollectError::Timeout)),
                Box::new(AlwaysFails("relay:1", CollectError::Http(502))),
            ],
        );
        let result = collector
            .collect(NaiveDate::from_ymd_opt(2025, 8, 12).unwrap())
            .await;

        assert!(!result.success);
        assert_eq!(result.error, Some(CollectError::Http(502)));
    }
}
