// tests/ingest_cycle.rs
//! A failing source must not take down the rest of the cycle, and only
//! successfully fetched sources get their `last_fetched_at` stamped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use radar::fetch::{FetchedBody, TextFetcher};
use radar::model::{FilterPolicy, Source, SourceType, Topic};
use radar::services::{DisabledSummarizer, DisabledTranscript};
use radar::store::{ItemUpdate, MemoryStore, SourceUpdate, Store, StoredItem};
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
}

#[async_trait]
impl TextFetcher for ScriptedFetcher {
    async fn get_text(&self, url: &str) -> Result<FetchedBody> {
        let body = self
            .responses
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("unscripted url: {url}"))?;
        Ok(FetchedBody {
            body,
            content_type: None,
        })
    }

    async fn get_json(&self, _url: &str) -> Result<serde_json::Value> {
        Err(anyhow!("no json scripted"))
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

fn feed(title: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel>
  <item><title>{title}</title><link>https://example.test/{title}</link><guid>g-{title}</guid></item>
</channel></rss>"#
    )
}

#[tokio::test]
async fn one_broken_source_does_not_abort_the_cycle() {
    let store = Arc::new(MemoryStore::new());
    store.add_source(rss_source("src-a", "https://a.test/feed"));
    store.add_source(rss_source("src-b", "https://b.test/feed"));
    store.add_source(rss_source("src-c", "https://c.test/feed"));

    let good_a = feed("alpha");
    let good_c = feed("gamma");
    let fetcher = Arc::new(ScriptedFetcher::new(&[
        ("https://a.test/feed", good_a.as_str()),
        ("https://b.test/feed", "this is not a feed at all"),
        ("https://c.test/feed", good_c.as_str()),
    ]));

    let deps = IngestDeps {
        store: store.clone(),
        fetcher,
        transcript: Arc::new(DisabledTranscript),
        summarizer: Arc::new(DisabledSummarizer),
        youtube_api_key: None,
        polymarket_limit: 5,
    };

    let report = run_cycle(&deps, SourceType::Rss, "acct-1", None)
        .await
        .unwrap();

    assert_eq!(report.sources_processed, 3);
    assert_eq!(report.items_inserted, 2);
    assert_eq!(report.per_source_errors.len(), 1);
    assert_eq!(report.per_source_errors[0].source_id, "src-b");

    // Only the successful fetches count as fetched.
    let a = store.get_source("src-a").await.unwrap().unwrap();
    let b = store.get_source("src-b").await.unwrap().unwrap();
    let c = store.get_source("src-c").await.unwrap().unwrap();
    assert!(a.last_fetched_at.is_some());
    assert!(b.last_fetched_at.is_none());
    assert!(c.last_fetched_at.is_some());
}

#[tokio::test]
async fn inactive_sources_are_not_fetched() {
    let store = Arc::new(MemoryStore::new());
    store.add_source(Source {
        active: false,
        ..rss_source("src-off", "https://off.test/feed")
    });
    let fetcher = Arc::new(ScriptedFetcher::new(&[]));
    let deps = IngestDeps {
        store: store.clone(),
        fetcher,
        transcript: Arc::new(DisabledTranscript),
        summarizer: Arc::new(DisabledSummarizer),
        youtube_api_key: None,
        polymarket_limit: 5,
    };

    let report = run_cycle(&deps, SourceType::Rss, "acct-1", None)
        .await
        .unwrap();
    assert_eq!(report.sources_processed, 0);
    assert_eq!(store.item_count(), 0);
}

/// Delegates to a `MemoryStore` but rejects inserts for one external id,
/// standing in for a row the database refuses.
struct RejectingStore {
    inner: MemoryStore,
    reject_external_id: String,
}

#[async_trait]
impl Store for RejectingStore {
    async fn find_item(&self, account_id: &str, external_id: &str) -> Result<Option<StoredItem>> {
        self.inner.find_item(account_id, external_id).await
    }

    async fn insert_item(&self, row: StoredItem) -> Result<()> {
        if row.item.external_id == self.reject_external_id {
            return Err(anyhow!("insert rejected by store"));
        }
        self.inner.insert_item(row).await
    }

    async fn update_item(&self, id: &str, update: ItemUpdate) -> Result<()> {
        self.inner.update_item(id, update).await
    }

    async fn get_source(&self, id: &str) -> Result<Option<Source>> {
        self.inner.get_source(id).await
    }

    async fn list_sources(
        &self,
        account_id: &str,
        source_type: SourceType,
        active_only: bool,
    ) -> Result<Vec<Source>> {
        self.inner.list_sources(account_id, source_type, active_only).await
    }

    async fn update_source(&self, id: &str, update: SourceUpdate) -> Result<()> {
        self.inner.update_source(id, update).await
    }

    async fn list_topics(&self, account_id: &str) -> Result<Vec<Topic>> {
        self.inner.list_topics(account_id).await
    }
}

#[tokio::test]
async fn rejected_insert_is_counted_but_does_not_abort_the_source() {
    let inner = MemoryStore::new();
    inner.add_source(rss_source("src-a", "https://a.test/feed"));
    let store = Arc::new(RejectingStore {
        inner,
        reject_external_id: "g-two".into(),
    });

    let feed = r#"<?xml version="1.0"?><rss version="2.0"><channel>
  <item><title>One</title><link>https://a.test/1</link><guid>g-one</guid></item>
  <item><title>Two</title><link>https://a.test/2</link><guid>g-two</guid></item>
  <item><title>Three</title><link>https://a.test/3</link><guid>g-three</guid></item>
</channel></rss>"#;
    let fetcher = Arc::new(ScriptedFetcher::new(&[("https://a.test/feed", feed)]));

    let deps = IngestDeps {
        store: store.clone(),
        fetcher,
        transcript: Arc::new(DisabledTranscript),
        summarizer: Arc::new(DisabledSummarizer),
        youtube_api_key: None,
        polymarket_limit: 5,
    };

    let report = run_cycle(&deps, SourceType::Rss, "acct-1", None)
        .await
        .unwrap();

    // The items around the rejected one still land.
    assert_eq!(report.items_inserted, 2);
    assert_eq!(store.inner.item_count(), 2);
    assert!(store
        .find_item("acct-1", "g-one")
        .await
        .unwrap()
        .is_some());
    assert!(store
        .find_item("acct-1", "g-three")
        .await
        .unwrap()
        .is_some());

    // The failure is attributed to the source in the report.
    assert_eq!(report.per_source_errors.len(), 1);
    assert_eq!(report.per_source_errors[0].source_id, "src-a");
    assert!(report.per_source_errors[0].message.contains("g-two"));

    // The fetch itself succeeded, so the source still counts as fetched.
    let source = store.get_source("src-a").await.unwrap().unwrap();
    assert!(source.last_fetched_at.is_some());
}

#[tokio::test]
async fn explicit_source_id_must_match_account_and_type() {
    let store = Arc::new(MemoryStore::new());
    store.add_source(rss_source("src-a", "https://a.test/feed"));
    store.add_source(Source {
        account_id: "acct-2".into(),
        ..rss_source("src-other", "https://other.test/feed")
    });

    let fetcher = Arc::new(ScriptedFetcher::new(&[]));
    let deps = IngestDeps {
        store,
        fetcher,
        transcript: Arc::new(DisabledTranscript),
        summarizer: Arc::new(DisabledSummarizer),
        youtube_api_key: None,
        polymarket_limit: 5,
    };

    // Wrong account.
    assert!(run_cycle(&deps, SourceType::Rss, "acct-1", Some("src-other"))
        .await
        .is_err());
    // Wrong type for the cycle.
    assert!(
        run_cycle(&deps, SourceType::Youtube, "acct-1", Some("src-a"))
            .await
            .is_err()
    );
    // Unknown id.
    assert!(run_cycle(&deps, SourceType::Rss, "acct-1", Some("missing"))
        .await
        .is_err());
}
