// src/store.rs
//! Persistence boundary. The hosted relational database is an external
//! collaborator; the pipeline only depends on this trait. `MemoryStore`
//! backs tests and local runs.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ItemMetadata, NormalizedItem, Source, SourceType, Topic};

/// A persisted content row: the normalized item plus storage identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub id: String,
    pub account_id: String,
    pub source_id: String,
    #[serde(flatten)]
    pub item: NormalizedItem,
    pub created_at: DateTime<Utc>,
}

/// Mutable fields for "live" source types (Polymarket odds/volume).
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub summary: Option<String>,
    pub thumbnail_url: Option<String>,
    pub metadata: Option<ItemMetadata>,
}

#[derive(Debug, Clone, Default)]
pub struct SourceUpdate {
    pub channel_id: Option<String>,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_item(&self, account_id: &str, external_id: &str) -> Result<Option<StoredItem>>;
    async fn insert_item(&self, row: StoredItem) -> Result<()>;
    async fn update_item(&self, id: &str, update: ItemUpdate) -> Result<()>;

    async fn get_source(&self, id: &str) -> Result<Option<Source>>;
    async fn list_sources(
        &self,
        account_id: &str,
        source_type: SourceType,
        active_only: bool,
    ) -> Result<Vec<Source>>;
    async fn update_source(&self, id: &str, update: SourceUpdate) -> Result<()>;

    async fn list_topics(&self, account_id: &str) -> Result<Vec<Topic>>;
}

/// In-memory store keyed the same way the real one is: items by
/// `(account_id, external_id)`, sources and topics by id.
#[derive(Default)]
pub struct MemoryStore {
    items: RwLock<HashMap<(String, String), StoredItem>>,
    sources: RwLock<HashMap<String, Source>>,
    topics: RwLock<Vec<Topic>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(sources: Vec<Source>) -> Self {
        let store = Self::new();
        {
            let mut map = store.sources.write().expect("sources lock");
            for s in sources {
                map.insert(s.id.clone(), s);
            }
        }
        store
    }

    pub fn add_source(&self, source: Source) {
        self.sources
            .write()
            .expect("sources lock")
            .insert(source.id.clone(), source);
    }

    pub fn add_topics(&self, topics: Vec<Topic>) {
        self.topics.write().expect("topics lock").extend(topics);
    }

    pub fn item_count(&self) -> usize {
        self.items.read().expect("items lock").len()
    }

    pub fn items_snapshot(&self) -> Vec<StoredItem> {
        self.items
            .read()
            .expect("items lock")
            .values()
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_item(&self, account_id: &str, external_id: &str) -> Result<Option<StoredItem>> {
        let items = self.items.read().expect("items lock");
        Ok(items
            .get(&(account_id.to_string(), external_id.to_string()))
            .cloned())
    }

    async fn insert_item(&self, row: StoredItem) -> Result<()> {
        let key = (row.account_id.clone(), row.item.external_id.clone());
        let mut items = self.items.write().expect("items lock");
        if items.contains_key(&key) {
            // Mirrors the DB unique constraint on (account_id, external_id).
            return Err(anyhow!(
                "duplicate item for account {} external_id {}",
                key.0,
                key.1
            ));
        }
        items.insert(key, row);
        Ok(())
    }

    async fn update_item(&self, id: &str, update: ItemUpdate) -> Result<()> {
        let mut items = self.items.write().expect("items lock");
        let row = items
            .values_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow!("no item with id {id}"))?;
        if let Some(summary) = update.summary {
            row.item.summary = Some(summary);
        }
        if let Some(thumb) = update.thumbnail_url {
            row.item.thumbnail_url = Some(thumb);
        }
        if let Some(meta) = update.metadata {
            row.item.metadata = meta;
        }
        Ok(())
    }

    async fn get_source(&self, id: &str) -> Result<Option<Source>> {
        Ok(self.sources.read().expect("sources lock").get(id).cloned())
    }

    async fn list_sources(
        &self,
        account_id: &str,
        source_type: SourceType,
        active_only: bool,
    ) -> Result<Vec<Source>> {
        let sources = self.sources.read().expect("sources lock");
        let mut out: Vec<Source> = sources
            .values()
            .filter(|s| {
                s.account_id == account_id
                    && s.source_type == source_type
                    && (!active_only || s.active)
            })
            .cloned()
            .collect();
        // Deterministic iteration for tests and stable cycle ordering.
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn update_source(&self, id: &str, update: SourceUpdate) -> Result<()> {
        let mut sources = self.sources.write().expect("sources lock");
        let source = sources
            .get_mut(id)
            .ok_or_else(|| anyhow!("no source with id {id}"))?;
        if let Some(channel_id) = update.channel_id {
            source.channel_id = Some(channel_id);
        }
        if let Some(ts) = update.last_fetched_at {
            source.last_fetched_at = Some(ts);
        }
        Ok(())
    }

    async fn list_topics(&self, account_id: &str) -> Result<Vec<Topic>> {
        let _ = account_id; // single-tenant in memory; topics are per-store
        Ok(self.topics.read().expect("topics lock").clone())
    }
}
