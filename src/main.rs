//! Radar ingestion service — binary entrypoint.
//! Boots the Axum HTTP server, wiring the store, HTTP fetcher, collaborator
//! services, metrics, and the optional background scheduler.

use std::sync::Arc;
use std::time::Duration;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use radar::config::RadarConfig;
use radar::fetch::HttpFetcher;
use radar::ingest::scheduler::{spawn_cycle_scheduler, SchedulerCfg};
use radar::metrics::Metrics;
use radar::services::build_services;
use radar::store::MemoryStore;
use radar::{create_router, AppState, IngestDeps};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - RADAR_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("RADAR_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingest=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let config = RadarConfig::load().expect("Failed to load radar config");

    let fetcher = Arc::new(
        HttpFetcher::new(Duration::from_secs(config.fetch_timeout_secs))
            .expect("Failed to build http client"),
    );
    let services_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .expect("Failed to build services client");
    let (transcript, summarizer) = build_services(
        &services_client,
        config.openai_api_key.clone(),
        config.summarizer_model.clone(),
        config.transcript_base_url.clone(),
    );

    let deps = IngestDeps {
        store: Arc::new(MemoryStore::new()),
        fetcher,
        transcript,
        summarizer,
        youtube_api_key: config.youtube_api_key.clone(),
        polymarket_limit: config.polymarket_limit,
    };

    // Optional interval scheduler; HTTP-triggered cycles work regardless.
    if let Some(sched) = &config.schedule {
        spawn_cycle_scheduler(
            deps.clone(),
            SchedulerCfg {
                interval_secs: sched.interval_secs,
                account_id: sched.account_id.clone(),
            },
        );
    }

    let metrics = Metrics::init();
    let router = create_router(AppState { deps }).merge(metrics.router());

    Ok(router.into())
}
