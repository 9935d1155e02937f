// src/model.rs
//! Canonical content model shared by every extractor, plus the source
//! configuration the pipeline consumes read-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminates downstream rendering. Assigned by extractors, never inferred later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Video,
    Prediction,
}

/// Which extractor a source feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Rss,
    Youtube,
    Polymarket,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Rss => "rss",
            SourceType::Youtube => "youtube",
            SourceType::Polymarket => "polymarket",
        }
    }
}

/// Type-specific payload, decoded once at the extraction boundary.
/// Raw Polymarket market/tag shapes are preserved losslessly because the
/// dashboard parses them later (odds deltas, multi-candidate ranking).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemMetadata {
    Rss {
        #[serde(default)]
        categories: Vec<String>,
    },
    Youtube {
        channel_id: String,
        video_id: String,
    },
    Polymarket {
        volume: Option<f64>,
        volume_24hr: Option<f64>,
        liquidity: Option<f64>,
        end_date: Option<String>,
        markets: serde_json::Value,
        tags: serde_json::Value,
        #[serde(default)]
        last_updated: Option<DateTime<Utc>>,
    },
}

/// The canonical output of every extractor.
///
/// `external_id` + account scope is the only uniqueness key; a re-fetch of the
/// same external object must resolve to an update, never a second insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub external_id: String,
    pub content_type: ContentType,
    pub title: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<u32>,
    pub metadata: ItemMetadata,
}

/// Per-source Polymarket filter policy. Empty keyword/category lists are
/// vacuously true for their dimension; see `filter::filter_events`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPolicy {
    pub exclude_sports: bool,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self {
            exclude_sports: true,
            keywords: Vec::new(),
            categories: Vec::new(),
        }
    }
}

/// A configured external feed. Owned by the UI/DB layer; the pipeline reads it
/// and only writes back `channel_id` (cached resolution) and `last_fetched_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub account_id: String,
    pub source_type: SourceType,
    pub url: String,
    /// Cached YouTube channel-ID resolution; resolved once, then reused.
    pub channel_id: Option<String>,
    pub topic_id: Option<String>,
    #[serde(default)]
    pub filter: FilterPolicy,
    #[serde(default = "default_true")]
    pub active: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
}

fn default_true() -> bool {
    true
}

/// A user topic, matched against new sources by the suggestion scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    Rss,
    Atom,
}

/// Ephemeral result of feed discovery; the caller picks one and creates a Source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveredFeed {
    pub url: String,
    pub title: Option<String>,
    #[serde(rename = "type")]
    pub kind: FeedKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceError {
    pub source_id: String,
    pub message: String,
}

/// Unified result of one fetch cycle, regardless of source type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub sources_processed: usize,
    pub items_inserted: usize,
    pub items_updated: usize,
    pub items_skipped: usize,
    pub items_filtered: usize,
    pub per_source_errors: Vec<SourceError>,
}

impl CycleReport {
    pub fn record_error(&mut self, source_id: &str, message: impl Into<String>) {
        self.per_source_errors.push(SourceError {
            source_id: source_id.to_string(),
            message: message.into(),
        });
    }

    pub fn merge(&mut self, other: CycleReport) {
        self.sources_processed += other.sources_processed;
        self.items_inserted += other.items_inserted;
        self.items_updated += other.items_updated;
        self.items_skipped += other.items_skipped;
        self.items_filtered += other.items_filtered;
        self.per_source_errors.extend(other.per_source_errors);
    }
}
