// src/ingest/extract/youtube.rs
//! YouTube extractor. Works off a channel's public Atom feed (zero quota);
//! entries lacking a `yt:videoId` are skipped, thumbnails are synthesized
//! deterministically, and transcripts/summaries are best-effort enrichment
//! that can never fail an item.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use tracing::debug;

use crate::model::{ContentType, ItemMetadata, NormalizedItem};
use crate::scan;
use crate::services::{Summarizer, TranscriptService};

use super::rss::parse_rfc3339;

/// Entries older than this are not current news and are silently skipped.
pub const MAX_AGE_DAYS: i64 = 30;

const SUMMARY_CHARS: usize = 300;

pub fn feed_url(channel_id: &str) -> String {
    format!("https://www.youtube.com/feeds/videos.xml?channel_id={channel_id}")
}

pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{video_id}/hqdefault.jpg")
}

pub fn video_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={video_id}")
}

/* ----------------------------
Atom wire shapes (YouTube flavor)
---------------------------- */

#[derive(Debug, Deserialize)]
struct YtFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<YtEntry>,
}

#[derive(Debug, Deserialize)]
struct YtEntry {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
    title: Option<String>,
    published: Option<String>,
    author: Option<YtAuthor>,
    #[serde(rename = "group")]
    media_group: Option<YtMediaGroup>,
}

#[derive(Debug, Deserialize)]
struct YtAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct YtMediaGroup {
    #[serde(rename = "description")]
    description: Option<String>,
}

/// One parsed feed entry before enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoEntry {
    pub video_id: String,
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Parse the channel feed and apply the age cutoff against `now`.
/// Entries without a `yt:videoId` tag are skipped, not errors.
pub fn parse_feed(xml: &str, now: DateTime<Utc>) -> Result<Vec<VideoEntry>> {
    let t0 = std::time::Instant::now();
    let feed: YtFeed = from_str(xml).context("parsing youtube atom feed")?;
    let cutoff = now - Duration::days(MAX_AGE_DAYS);

    let mut out = Vec::with_capacity(feed.entries.len());
    for entry in feed.entries {
        let Some(video_id) = entry.video_id.filter(|v| !v.is_empty()) else {
            continue;
        };
        let published_at = entry.published.as_deref().and_then(parse_rfc3339);
        if let Some(ts) = published_at {
            if ts < cutoff {
                continue;
            }
        }
        out.push(VideoEntry {
            video_id,
            title: scan::decode_entities(entry.title.as_deref().unwrap_or_default())
                .trim()
                .to_string(),
            description: scan::decode_entities(
                entry
                    .media_group
                    .as_ref()
                    .and_then(|g| g.description.as_deref())
                    .unwrap_or_default(),
            )
            .trim()
            .to_string(),
            author: entry.author.and_then(|a| a.name).filter(|n| !n.is_empty()),
            published_at,
        });
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);
    counter!("ingest_events_total").increment(out.len() as u64);
    Ok(out)
}

/// Normalize one entry, attempting transcript + AI summary. Transcript or
/// summarization failure falls back to the truncated feed description and
/// never surfaces to the caller.
pub async fn normalize(
    entry: &VideoEntry,
    channel_id: &str,
    transcript_svc: &dyn TranscriptService,
    summarizer: &dyn Summarizer,
) -> NormalizedItem {
    let mut content = None;
    let mut summary = None;

    if let Some(transcript) = transcript_svc.transcript(&entry.video_id).await {
        summary = summarizer.summarize(&transcript, &entry.title).await;
        content = Some(transcript);
    } else {
        debug!(video_id = %entry.video_id, "no transcript; using feed description");
    }

    let summary = summary.or_else(|| {
        let desc = scan::truncate_chars(&entry.description, SUMMARY_CHARS);
        (!desc.is_empty()).then_some(desc)
    });

    NormalizedItem {
        external_id: entry.video_id.clone(),
        content_type: ContentType::Video,
        title: entry.title.clone(),
        summary,
        content,
        url: video_url(&entry.video_id),
        thumbnail_url: Some(thumbnail_url(&entry.video_id)),
        author: entry.author.clone(),
        published_at: entry.published_at,
        duration_seconds: None,
        metadata: ItemMetadata::Youtube {
            channel_id: channel_id.to_string(),
            video_id: entry.video_id.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_xml(entries: &[(&str, &str, &str)]) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015"
      xmlns:media="http://search.yahoo.com/mrss/"
      xmlns="http://www.w3.org/2005/Atom">"#,
        );
        for (id, title, published) in entries {
            xml.push_str(&format!(
                r#"<entry>
  <yt:videoId>{id}</yt:videoId>
  <title>{title}</title>
  <published>{published}</published>
  <author><name>Chan</name></author>
  <media:group><media:description>Desc &amp; more</media:description></media:group>
</entry>"#
            ));
        }
        xml.push_str("</feed>");
        xml
    }

    fn fixed_now() -> DateTime<Utc> {
        parse_rfc3339("2026-02-01T00:00:00Z").unwrap()
    }

    #[test]
    fn parses_entries_and_decodes_entities() {
        let xml = feed_xml(&[("vid01", "A &amp; B &#33;", "2026-01-20T00:00:00Z")]);
        let entries = parse_feed(&xml, fixed_now()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "A & B !");
        assert_eq!(entries[0].description, "Desc & more");
        assert_eq!(entries[0].author.as_deref(), Some("Chan"));
    }

    #[test]
    fn age_cutoff_is_thirty_days() {
        // 29 days old: kept. 31 days old: skipped.
        let xml = feed_xml(&[
            ("fresh01", "fresh", "2026-01-03T00:00:00Z"),
            ("stale01", "stale", "2026-01-01T00:00:00Z"),
        ]);
        let entries = parse_feed(&xml, fixed_now()).unwrap();
        let ids: Vec<_> = entries.iter().map(|e| e.video_id.as_str()).collect();
        assert_eq!(ids, vec!["fresh01"]);
    }

    #[test]
    fn entries_without_video_id_are_skipped() {
        let xml = r#"<?xml version="1.0"?>
<feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns="http://www.w3.org/2005/Atom">
  <entry><title>no id here</title><published>2026-01-20T00:00:00Z</published></entry>
  <entry><yt:videoId>ok1</yt:videoId><title>has id</title><published>2026-01-20T00:00:00Z</published></entry>
</feed>"#;
        let entries = parse_feed(xml, fixed_now()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].video_id, "ok1");
    }

    #[test]
    fn thumbnail_is_synthesized() {
        assert_eq!(
            thumbnail_url("abc123"),
            "https://i.ytimg.com/vi/abc123/hqdefault.jpg"
        );
    }
}
