//! Scraping collectors for the secondary HTML sources
//!
//! Each scraping collector pairs a page fetch with the source's pattern
//! parser. The page carries no shape guarantee; correctness depends on the
//! parser's patterns for that template, which must be revisited whenever the
//! upstream page changes.

use crate::collectors::{classify_reqwest_error, Collector};
use crate::parsers;
use crate::types::{CollectError, CollectionResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::debug;
use ww_common::calendar;

pub struct ScrapeCollector {
    source_id: String,
    url: String,
    priority: u32,
    client: reqwest::Client,
}

impl ScrapeCollector {
    pub fn new(
        source_id: impl Into<String>,
        url: impl Into<String>,
        priority: u32,
        client: reqwest::Client,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            url: url.into(),
            priority,
            client,
        }
    }

    /// The default secondary sources, in priority order after the
    /// authoritative collector.
    pub fn default_sources(client: &reqwest::Client) -> Vec<ScrapeCollector> {
        vec![
            ScrapeCollector::new(
                "tomsguide",
                "https://www.tomsguide.com/news/wordle-today",
                1,
                client.clone(),
            ),
            ScrapeCollector::new(
                "techradar",
                "https://www.techradar.com/news/wordle-today",
                2,
                client.clone(),
            ),
            ScrapeCollector::new(
                "wordtips",
                "https://word.tips/todays-wordle-answer/",
                3,
                client.clone(),
            ),
        ]
    }

    async fn fetch_page(&self) -> Result<String, CollectError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectError::Http(status.as_u16()));
        }

        response.text().await.map_err(classify_reqwest_error)
    }
}

#[async_trait]
impl Collector for ScrapeCollector {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn collect(&self, date: NaiveDate) -> CollectionResult {
        let game_number = match calendar::game_number(date) {
            Ok(n) => n,
            Err(e) => {
                return CollectionResult::failure(
                    self.source_id.clone(),
                    CollectError::Parse(e.to_string()),
                )
            }
        };

        let page = match self.fetch_page().await {
            Ok(page) => page,
            Err(e) => return CollectionResult::failure(self.source_id.clone(), e),
        };

        match parsers::extract(&self.source_id, &page) {
            Some(word) => {
                debug!(source = %self.source_id, game_number, %word, "Scrape extraction hit");
                CollectionResult::success(self.source_id.clone(), game_number, word, date)
            }
            None => CollectionResult::failure(
                self.source_id.clone(),
                CollectError::Parse("no extraction pattern matched".to_string()),
            ),
        }
    }
}
