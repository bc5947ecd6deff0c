//! ww-pd - Prediction Daemon
//!
//! Determines a single trusted five-letter answer per daily game number by
//! reconciling an authoritative feed with several scraped sources, scores
//! its confidence, and persists the determination through its lifecycle.
//! Exposes an HTTP API for reads and manual triggers.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use ww_pd::collectors::{
    build_http_client, AuthoritativeCollector, Collector, CollectorChain, ScrapeCollector,
};
use ww_pd::config::PipelineConfig;
use ww_pd::scheduler::{PipelineScheduler, SchedulerConfig};
use ww_pd::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting ww-pd (Prediction Daemon)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = PipelineConfig::resolve();

    // Resolve data directory and open/create the database
    let data_dir = ww_common::config::resolve_data_dir("WORDWATCH_DATA_DIR");
    let db_path = ww_common::config::database_path(&data_dir);
    info!("Database: {}", db_path.display());
    let db_pool = ww_common::db::init_database(&db_path).await?;
    info!("Database connection established");

    // Collector chain: authoritative feed first, scraped sources after
    let client = build_http_client(config.request_timeout)
        .map_err(|e| anyhow::anyhow!("HTTP client init failed: {}", e))?;
    let mut collectors: Vec<Arc<dyn Collector>> = vec![Arc::new(AuthoritativeCollector::new(
        client.clone(),
        &config.relay_urls,
    ))];
    for scraper in ScrapeCollector::default_sources(&client) {
        collectors.push(Arc::new(scraper));
    }
    let chain = Arc::new(CollectorChain::new(collectors, config.request_timeout));
    info!("Collector chain ready: {} sources", chain.source_count());

    // Scheduler: daily collection, hourly verification, on-demand backfill
    let scheduler = Arc::new(PipelineScheduler::new(
        db_pool.clone(),
        chain,
        SchedulerConfig {
            backfill_delay: config.backfill_delay,
            ..Default::default()
        },
    ));
    scheduler.start().await;

    let state = AppState::new(db_pool, scheduler);
    let app = ww_pd::build_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
