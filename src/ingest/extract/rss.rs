// src/ingest/extract/rss.rs
//! RSS/Atom extractor. Wire shapes are deserialized with quick-xml rather
//! than scanned with regexes so CDATA and namespaces behave; only the
//! HTML snippets *inside* fields go through `scan`.

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::model::{ContentType, ItemMetadata, NormalizedItem, Source};
use crate::scan;
use crate::thumbnail;

/// Only the newest N feed items are considered per cycle.
pub const MAX_ITEMS_PER_FEED: usize = 20;

const SUMMARY_CHARS: usize = 300;

/* ----------------------------
RSS 2.0 wire shapes
---------------------------- */

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RssItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub guid: Option<Guid>,
    #[serde(rename = "pubDate")]
    pub pub_date: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "encoded")]
    pub content_encoded: Option<String>,
    pub author: Option<String>,
    #[serde(rename = "creator")]
    pub creator: Option<String>,
    #[serde(rename = "category", default)]
    pub categories: Vec<Category>,
    pub enclosure: Option<Enclosure>,
    #[serde(rename = "thumbnail", default)]
    pub media_thumbnail: Vec<MediaThumbnail>,
    #[serde(rename = "content", default)]
    pub media_content: Vec<MediaContent>,
    #[serde(rename = "group")]
    pub media_group: Option<MediaGroup>,
    pub image: Option<ImageField>,
}

#[derive(Debug, Deserialize)]
pub struct Guid {
    #[serde(rename = "$text")]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Category {
    #[serde(rename = "$text")]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Enclosure {
    #[serde(rename = "@url")]
    pub url: Option<String>,
    #[serde(rename = "@type")]
    pub mime_type: Option<String>,
}

/// `media:thumbnail` appears attribute-style, property-style, and as a bare
/// string in the wild; accept all three.
#[derive(Debug, Default, Deserialize)]
pub struct MediaThumbnail {
    #[serde(rename = "@url")]
    pub url: Option<String>,
    #[serde(rename = "$text")]
    pub text: Option<String>,
}

impl MediaThumbnail {
    pub fn any_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| self.text.as_ref().map(|t| t.trim().to_string()))
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct MediaContent {
    #[serde(rename = "@url")]
    pub url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MediaGroup {
    #[serde(rename = "thumbnail", default)]
    pub media_thumbnail: Vec<MediaThumbnail>,
    #[serde(rename = "content", default)]
    pub media_content: Vec<MediaContent>,
}

/// Generic `image` element: bare string, `<url>` child, or attribute-style.
#[derive(Debug, Default, Deserialize)]
pub struct ImageField {
    #[serde(rename = "@url")]
    pub attr_url: Option<String>,
    #[serde(rename = "url")]
    pub url_child: Option<String>,
    #[serde(rename = "$text")]
    pub text: Option<String>,
}

impl ImageField {
    pub fn any_url(&self) -> Option<String> {
        self.attr_url
            .clone()
            .or_else(|| self.url_child.clone())
            .or_else(|| self.text.as_ref().map(|t| t.trim().to_string()))
            .filter(|s| !s.is_empty())
    }
}

/* ----------------------------
Atom wire shapes
---------------------------- */

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    content: Option<String>,
    author: Option<AtomAuthor>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

/* ----------------------------
Field helpers
---------------------------- */

pub fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let unix = OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())?;
    Utc.timestamp_opt(unix, 0).single()
}

pub fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Stable fallback id when a feed item carries neither guid nor link.
fn hashed_id(title: &str) -> String {
    let digest = Sha256::digest(title.as_bytes());
    let mut out = String::with_capacity(24);
    for b in digest.iter().take(12) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    format!("sha256:{out}")
}

fn external_id(item: &RssItem, title: &str) -> String {
    item.guid
        .as_ref()
        .and_then(|g| g.value.clone())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| item.link.clone().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| hashed_id(title))
}

/// Summary preference: the snippet field (`description`), else the first
/// 300 chars of the full content.
fn summary_of(description: Option<&str>, content: Option<&str>) -> Option<String> {
    if let Some(d) = description {
        let cleaned = scan::clean_text(d);
        if !cleaned.is_empty() {
            return Some(scan::truncate_chars(&cleaned, SUMMARY_CHARS));
        }
    }
    content
        .map(scan::clean_text)
        .filter(|c| !c.is_empty())
        .map(|c| scan::truncate_chars(&c, SUMMARY_CHARS))
}

/* ----------------------------
Extraction
---------------------------- */

fn from_rss_item(item: &RssItem) -> Option<NormalizedItem> {
    let title = scan::clean_text(item.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let url = item.link.clone().unwrap_or_default();
    let content = item
        .content_encoded
        .as_deref()
        .map(scan::clean_text)
        .filter(|c| !c.is_empty());
    let categories: Vec<String> = item
        .categories
        .iter()
        .filter_map(|c| c.value.as_ref())
        .map(|s| scan::clean_text(s))
        .filter(|s| !s.is_empty())
        .collect();

    Some(NormalizedItem {
        external_id: external_id(item, &title),
        content_type: ContentType::Article,
        summary: summary_of(item.description.as_deref(), item.content_encoded.as_deref()),
        content,
        url,
        thumbnail_url: thumbnail::resolve(item),
        author: item
            .creator
            .clone()
            .or_else(|| item.author.clone())
            .map(|a| scan::clean_text(&a))
            .filter(|a| !a.is_empty()),
        published_at: item.pub_date.as_deref().and_then(parse_rfc2822),
        duration_seconds: None,
        metadata: ItemMetadata::Rss { categories },
        title,
    })
}

fn from_atom_entry(entry: &AtomEntry) -> Option<NormalizedItem> {
    let title = scan::clean_text(entry.title.as_deref().unwrap_or_default());
    if title.is_empty() {
        return None;
    }
    let url = entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| entry.links.first())
        .and_then(|l| l.href.clone())
        .unwrap_or_default();
    let external_id = entry
        .id
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| (!url.is_empty()).then(|| url.clone()))
        .unwrap_or_else(|| hashed_id(&title));
    let content = entry
        .content
        .as_deref()
        .map(scan::clean_text)
        .filter(|c| !c.is_empty());

    Some(NormalizedItem {
        external_id,
        content_type: ContentType::Article,
        summary: summary_of(entry.summary.as_deref(), entry.content.as_deref()),
        content,
        url,
        thumbnail_url: entry
            .content
            .as_deref()
            .and_then(scan::first_img_src)
            .or_else(|| entry.summary.as_deref().and_then(scan::first_img_src)),
        author: entry
            .author
            .as_ref()
            .and_then(|a| a.name.clone())
            .map(|a| scan::clean_text(&a))
            .filter(|a| !a.is_empty()),
        published_at: entry
            .published
            .as_deref()
            .or(entry.updated.as_deref())
            .and_then(parse_rfc3339),
        duration_seconds: None,
        metadata: ItemMetadata::Rss { categories: vec![] },
        title,
    })
}

/// Parse a raw RSS or Atom document into normalized articles.
/// One malformed document is a per-source failure; the caller records the
/// error string and moves on to the next source.
pub fn extract(source: &Source, xml: &str) -> Result<Vec<NormalizedItem>> {
    let t0 = std::time::Instant::now();

    let items: Vec<NormalizedItem> = if let Ok(rss) = from_str::<Rss>(xml) {
        rss.channel
            .items
            .iter()
            .take(MAX_ITEMS_PER_FEED)
            .filter_map(from_rss_item)
            .collect()
    } else {
        let feed: AtomFeed = from_str(xml)
            .with_context(|| format!("parsing feed xml for source {}", source.id))?;
        feed.entries
            .iter()
            .take(MAX_ITEMS_PER_FEED)
            .filter_map(from_atom_entry)
            .collect()
    };

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_events_total").increment(items.len() as u64);
    Ok(items)
}
