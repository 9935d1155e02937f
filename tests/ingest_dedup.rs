// tests/ingest_dedup.rs
//! Dedup idempotence: refetching identical upstream data must not create
//! duplicates; Polymarket refetches update live fields in place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use radar::fetch::{FetchedBody, TextFetcher};
use radar::ingest::extract::polymarket::events_url;
use radar::model::{ContentType, FilterPolicy, ItemMetadata, Source, SourceType};
use radar::services::{DisabledSummarizer, DisabledTranscript};
use radar::store::{MemoryStore, Store};
use radar::{run_cycle, IngestDeps};

struct ScriptedFetcher {
    responses: Mutex<HashMap<String, String>>,
}

impl ScriptedFetcher {
    fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            responses: Mutex::new(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        }
    }

    fn set(&self, url: &str, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    fn lookup(&self, url: &str) -> Result<String> {
        self.responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("unscripted url: {url}"))
    }
}

#[async_trait]
impl TextFetcher for ScriptedFetcher {
    async fn get_text(&self, url: &str) -> Result<FetchedBody> {
        Ok(FetchedBody {
            body: self.lookup(url)?,
            content_type: None,
        })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        Ok(serde_json::from_str(&self.lookup(url)?)?)
    }
}

fn deps(store: Arc<MemoryStore>, fetcher: Arc<ScriptedFetcher>) -> IngestDeps {
    IngestDeps {
        store,
        fetcher,
        transcript: Arc::new(DisabledTranscript),
        summarizer: Arc::new(DisabledSummarizer),
        youtube_api_key: None,
        polymarket_limit: 5,
    }
}

fn rss_source(id: &str, url: &str) -> Source {
    Source {
        id: id.into(),
        account_id: "acct-1".into(),
        source_type: SourceType::Rss,
        url: url.into(),
        channel_id: None,
        topic_id: None,
        filter: FilterPolicy::default(),
        active: true,
        last_fetched_at: None,
    }
}

const RSS_FIXTURE: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item><title>Alpha</title><link>https://example.test/a</link><guid>g-a</guid></item>
  <item><title>Beta</title><link>https://example.test/b</link><guid>g-b</guid></item>
</channel></rss>"#;

#[tokio::test]
async fn refetching_rss_inserts_nothing_new() {
    let store = Arc::new(MemoryStore::new());
    store.add_source(rss_source("src-1", "https://example.test/feed"));
    let fetcher = Arc::new(ScriptedFetcher::new(&[(
        "https://example.test/feed",
        RSS_FIXTURE,
    )]));
    let deps = deps(store.clone(), fetcher);

    let first = run_cycle(&deps, SourceType::Rss, "acct-1", None)
        .await
        .unwrap();
    assert_eq!(first.items_inserted, 2);
    assert_eq!(store.item_count(), 2);

    let second = run_cycle(&deps, SourceType::Rss, "acct-1", None)
        .await
        .unwrap();
    assert_eq!(second.items_inserted, 0);
    assert_eq!(second.items_skipped, 2);
    assert_eq!(store.item_count(), 2);
}

fn polymarket_events(yes_price: &str, volume: f64) -> String {
    serde_json::json!([{
        "id": "9001",
        "title": "Will X happen by March?",
        "slug": "will-x",
        "volume": volume,
        "markets": [{
            "outcomes": "[\"Yes\", \"No\"]",
            "outcomePrices": format!("[\"{yes_price}\", \"0.5\"]")
        }],
        "tags": []
    }])
    .to_string()
}

#[tokio::test]
async fn polymarket_refetch_updates_live_fields_in_place() {
    let store = Arc::new(MemoryStore::new());
    store.add_source(Source {
        source_type: SourceType::Polymarket,
        filter: FilterPolicy {
            exclude_sports: false,
            ..FilterPolicy::default()
        },
        ..rss_source("src-pm", "https://polymarket.com")
    });

    let url = events_url(5);
    let fetcher = Arc::new(ScriptedFetcher::new(&[(
        url.as_str(),
        polymarket_events("0.40", 100.0).as_str(),
    )]));
    let deps = deps(store.clone(), fetcher.clone());

    let first = run_cycle(&deps, SourceType::Polymarket, "acct-1", None)
        .await
        .unwrap();
    assert_eq!(first.items_inserted, 1);

    // Odds move between cycles.
    fetcher.set(&url, &polymarket_events("0.61", 250.0));
    let second = run_cycle(&deps, SourceType::Polymarket, "acct-1", None)
        .await
        .unwrap();
    assert_eq!(second.items_inserted, 0);
    assert_eq!(second.items_updated, 1);
    assert_eq!(store.item_count(), 1);

    let row = store
        .find_item("acct-1", "polymarket:9001")
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(row.item.content_type, ContentType::Prediction);
    assert_eq!(row.item.summary.as_deref(), Some("Yes: 61% | No: 50%"));
    match &row.item.metadata {
        ItemMetadata::Polymarket { volume, .. } => assert_eq!(*volume, Some(250.0)),
        other => panic!("unexpected metadata: {other:?}"),
    }
}
