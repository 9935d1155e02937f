// src/ingest/mod.rs
//! Fetch-cycle orchestration: iterate an account's sources of one type,
//! extract, filter, and reconcile against the store. Nothing that happens
//! inside one source's processing may affect another source — the caller
//! only ever sees the aggregated `CycleReport`.

pub mod extract;
pub mod scheduler;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use once_cell::sync::OnceCell;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::channel;
use crate::fetch::TextFetcher;
use crate::filter;
use crate::model::{CycleReport, NormalizedItem, Source, SourceType};
use crate::services::{DynSummarizer, DynTranscript};
use crate::store::{ItemUpdate, SourceUpdate, Store, StoredItem};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_events_total", "Raw items parsed from sources.");
        describe_counter!("ingest_inserted_total", "New items persisted.");
        describe_counter!(
            "ingest_updated_total",
            "Existing items with live fields refreshed."
        );
        describe_counter!(
            "ingest_skipped_total",
            "Items already present and left untouched."
        );
        describe_counter!(
            "ingest_filtered_total",
            "Items dropped by the filter policy."
        );
        describe_counter!(
            "ingest_source_errors_total",
            "Sources that failed fetch/parse/resolution in a cycle."
        );
        describe_counter!("ingest_runs_total", "Fetch cycles executed.");
        describe_histogram!("ingest_parse_ms", "Per-source parse time in milliseconds.");
        describe_gauge!(
            "ingest_pipeline_last_run_ts",
            "Unix ts when a fetch cycle last completed."
        );
    });
}

/// Everything a cycle needs. The store and every network touch are behind
/// traits so tests run hermetically.
#[derive(Clone)]
pub struct IngestDeps {
    pub store: Arc<dyn Store>,
    pub fetcher: Arc<dyn TextFetcher>,
    pub transcript: DynTranscript,
    pub summarizer: DynSummarizer,
    pub youtube_api_key: Option<String>,
    /// How many open Polymarket events one cycle pulls.
    pub polymarket_limit: usize,
}

/// Per-source tallies folded into the cycle report.
#[derive(Debug, Default)]
struct SourceStats {
    inserted: usize,
    updated: usize,
    skipped: usize,
    filtered: usize,
    item_errors: Vec<String>,
}

enum UpsertOutcome {
    Inserted,
    Updated,
    Skipped,
}

fn row_id(account_id: &str, external_id: &str) -> String {
    let digest = Sha256::digest(format!("{account_id}\n{external_id}").as_bytes());
    let mut out = String::with_capacity(24);
    for b in digest.iter().take(12) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    format!("itm-{out}")
}

/// Lookup-then-branch reconciliation for one item. `live` marks source
/// types whose fields mutate between fetches (Polymarket odds/volume).
async fn upsert_item(
    store: &dyn Store,
    source: &Source,
    item: NormalizedItem,
    live: bool,
) -> Result<UpsertOutcome> {
    let existing = store
        .find_item(&source.account_id, &item.external_id)
        .await
        .context("item lookup")?;

    match existing {
        None => {
            let row = StoredItem {
                id: row_id(&source.account_id, &item.external_id),
                account_id: source.account_id.clone(),
                source_id: source.id.clone(),
                item,
                created_at: Utc::now(),
            };
            store.insert_item(row).await.context("item insert")?;
            Ok(UpsertOutcome::Inserted)
        }
        Some(row) if live => {
            store
                .update_item(
                    &row.id,
                    ItemUpdate {
                        summary: item.summary,
                        thumbnail_url: item.thumbnail_url,
                        metadata: Some(item.metadata),
                    },
                )
                .await
                .context("item update")?;
            Ok(UpsertOutcome::Updated)
        }
        Some(_) => Ok(UpsertOutcome::Skipped),
    }
}

async fn apply_items(
    store: &dyn Store,
    source: &Source,
    items: Vec<NormalizedItem>,
    live: bool,
) -> SourceStats {
    let mut stats = SourceStats::default();
    for item in items {
        let external_id = item.external_id.clone();
        match upsert_item(store, source, item, live).await {
            Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
            Ok(UpsertOutcome::Updated) => stats.updated += 1,
            Ok(UpsertOutcome::Skipped) => stats.skipped += 1,
            Err(e) => {
                // Persistence failure: logged and counted, never aborts the
                // rest of the source's items.
                warn!(error = ?e, external_id, source = %source.id, "item upsert failed");
                stats.item_errors.push(format!("{external_id}: {e:#}"));
            }
        }
    }
    stats
}

async fn process_rss_source(deps: &IngestDeps, source: &Source) -> Result<SourceStats> {
    let fetched = deps
        .fetcher
        .get_text(&source.url)
        .await
        .with_context(|| format!("fetching feed {}", source.url))?;
    let items = extract::rss::extract(source, &fetched.body)?;
    Ok(apply_items(deps.store.as_ref(), source, items, false).await)
}

async fn process_youtube_source(deps: &IngestDeps, source: &Source) -> Result<SourceStats> {
    // Cached resolution first; resolve once and persist onto the source.
    let channel_id = match &source.channel_id {
        Some(id) => id.clone(),
        None => {
            let resolved = channel::resolve_channel_id(
                deps.fetcher.as_ref(),
                deps.youtube_api_key.as_deref(),
                &source.url,
            )
            .await
            .ok_or_else(|| anyhow!("could not resolve channel id for {}", source.url))?;
            deps.store
                .update_source(
                    &source.id,
                    SourceUpdate {
                        channel_id: Some(resolved.clone()),
                        ..SourceUpdate::default()
                    },
                )
                .await
                .context("caching channel id")?;
            resolved
        }
    };

    let feed_url = extract::youtube::feed_url(&channel_id);
    let fetched = deps
        .fetcher
        .get_text(&feed_url)
        .await
        .with_context(|| format!("fetching channel feed {feed_url}"))?;
    let entries = extract::youtube::parse_feed(&fetched.body, Utc::now())?;

    let mut items = Vec::with_capacity(entries.len());
    for entry in &entries {
        items.push(
            extract::youtube::normalize(
                entry,
                &channel_id,
                deps.transcript.as_ref(),
                deps.summarizer.as_ref(),
            )
            .await,
        );
    }
    Ok(apply_items(deps.store.as_ref(), source, items, false).await)
}

async fn process_polymarket_source(deps: &IngestDeps, source: &Source) -> Result<SourceStats> {
    let url = extract::polymarket::events_url(deps.polymarket_limit);
    let json = deps
        .fetcher
        .get_json(&url)
        .await
        .context("fetching polymarket events")?;
    let events = extract::polymarket::parse_events(&json)?;
    let (kept, filtered) = filter::filter_events(events, &source.filter);

    let now = Utc::now();
    let items: Vec<NormalizedItem> = kept
        .iter()
        .map(|e| extract::polymarket::normalize(e, now))
        .collect();
    let mut stats = apply_items(deps.store.as_ref(), source, items, true).await;
    stats.filtered = filtered;
    Ok(stats)
}

async fn process_source(deps: &IngestDeps, source: &Source) -> Result<SourceStats> {
    match source.source_type {
        SourceType::Rss => process_rss_source(deps, source).await,
        SourceType::Youtube => process_youtube_source(deps, source).await,
        SourceType::Polymarket => process_polymarket_source(deps, source).await,
    }
}

/// Resolve which sources this cycle covers. `source_id` narrows to one
/// source, which must belong to the account and match the cycle's type.
async fn cycle_sources(
    deps: &IngestDeps,
    source_type: SourceType,
    account_id: &str,
    source_id: Option<&str>,
) -> Result<Vec<Source>> {
    match source_id {
        Some(id) => {
            let source = deps
                .store
                .get_source(id)
                .await?
                .ok_or_else(|| anyhow!("no source with id {id}"))?;
            if source.account_id != account_id {
                return Err(anyhow!(
                    "source {id} does not belong to account {account_id}"
                ));
            }
            if source.source_type != source_type {
                return Err(anyhow!(
                    "source {id} is {}, not {}",
                    source.source_type.as_str(),
                    source_type.as_str()
                ));
            }
            Ok(vec![source])
        }
        None => deps
            .store
            .list_sources(account_id, source_type, true)
            .await
            .context("listing sources"),
    }
}

/// Run one fetch cycle. Sources iterate sequentially; a total source
/// failure is recorded and skips that source's `last_fetched_at` so it
/// stays flagged for retry, while partial item failures still count as a
/// completed fetch.
pub async fn run_cycle(
    deps: &IngestDeps,
    source_type: SourceType,
    account_id: &str,
    source_id: Option<&str>,
) -> Result<CycleReport> {
    ensure_metrics_described();

    let sources = cycle_sources(deps, source_type, account_id, source_id).await?;
    let mut report = CycleReport::default();

    for source in &sources {
        report.sources_processed += 1;
        match process_source(deps, source).await {
            Ok(stats) => {
                report.items_inserted += stats.inserted;
                report.items_updated += stats.updated;
                report.items_skipped += stats.skipped;
                report.items_filtered += stats.filtered;
                for msg in stats.item_errors {
                    report.record_error(&source.id, msg);
                }
                // Fetch succeeded, even if individual items did not.
                if let Err(e) = deps
                    .store
                    .update_source(
                        &source.id,
                        SourceUpdate {
                            last_fetched_at: Some(Utc::now()),
                            ..SourceUpdate::default()
                        },
                    )
                    .await
                {
                    warn!(error = ?e, source = %source.id, "last_fetched_at update failed");
                }
            }
            Err(e) => {
                // Total source failure: recorded, last_fetched_at untouched.
                warn!(error = ?e, source = %source.id, "source fetch failed");
                counter!("ingest_source_errors_total").increment(1);
                report.record_error(&source.id, format!("{e:#}"));
            }
        }
    }

    counter!("ingest_runs_total").increment(1);
    counter!("ingest_inserted_total").increment(report.items_inserted as u64);
    counter!("ingest_updated_total").increment(report.items_updated as u64);
    counter!("ingest_skipped_total").increment(report.items_skipped as u64);
    counter!("ingest_filtered_total").increment(report.items_filtered as u64);
    gauge!("ingest_pipeline_last_run_ts").set(Utc::now().timestamp().max(0) as f64);

    info!(
        target: "ingest",
        source_type = source_type.as_str(),
        account = account_id,
        sources = report.sources_processed,
        inserted = report.items_inserted,
        updated = report.items_updated,
        skipped = report.items_skipped,
        filtered = report.items_filtered,
        errors = report.per_source_errors.len(),
        "cycle complete"
    );

    Ok(report)
}
