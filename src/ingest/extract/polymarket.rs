// src/ingest/extract/polymarket.rs
//! Polymarket extractor. Events come from the public Gamma API as JSON;
//! the odds summary is synthesized here, while the raw market/tag shapes
//! travel losslessly in metadata because the dashboard re-parses them
//! (odds deltas, multi-candidate ranking).

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Deserializer};

use crate::model::{ContentType, ItemMetadata, NormalizedItem};

/// Public Gamma API base (no auth required).
pub const GAMMA_API_BASE: &str = "https://gamma-api.polymarket.com";

/// Events endpoint for one cycle: open events, ordered by 24h volume.
pub fn events_url(limit: usize) -> String {
    format!("{GAMMA_API_BASE}/events?closed=false&order=volume24hr&ascending=false&limit={limit}")
}

/// Numbers arrive both as JSON numbers and as decimal strings.
fn de_loose_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Loose {
        Num(f64),
        Str(String),
        Null,
    }
    Ok(match Loose::deserialize(deserializer)? {
        Loose::Num(n) => Some(n),
        Loose::Str(s) => s.trim().parse().ok(),
        Loose::Null => None,
    })
}

/// A market "event" (a question grouping one or more markets).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolymarketEvent {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, deserialize_with = "de_loose_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "de_loose_f64")]
    pub volume24hr: Option<f64>,
    #[serde(default, deserialize_with = "de_loose_f64")]
    pub liquidity: Option<f64>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    /// Raw markets array, preserved losslessly.
    #[serde(default)]
    pub markets: serde_json::Value,
    /// Raw tags array, preserved losslessly.
    #[serde(default)]
    pub tags: serde_json::Value,
}

impl PolymarketEvent {
    /// Title + description, the text every filter dimension matches against.
    pub fn searchable_text(&self) -> String {
        format!(
            "{} {}",
            self.title.as_deref().unwrap_or_default(),
            self.description.as_deref().unwrap_or_default()
        )
    }

    /// Tag slugs and labels, lowercased, for category matching.
    pub fn tag_texts(&self) -> Vec<String> {
        let Some(tags) = self.tags.as_array() else {
            return Vec::new();
        };
        tags.iter()
            .flat_map(|t| {
                ["slug", "label"]
                    .iter()
                    .filter_map(|k| t.get(*k).and_then(|v| v.as_str()))
                    .map(|s| s.to_lowercase())
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Outcome names and prices of the first market. Both fields arrive
    /// either as JSON arrays or as JSON-encoded strings; accept both.
    pub fn first_market_outcomes(&self) -> Option<(Vec<String>, Vec<f64>)> {
        let market = self.markets.as_array()?.first()?;
        let outcomes = loose_array(market.get("outcomes")?)?
            .iter()
            .filter_map(|v| v.as_str().map(|s| s.to_string()))
            .collect::<Vec<_>>();
        let prices = loose_array(market.get("outcomePrices")?)?
            .iter()
            .filter_map(|v| match v {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(s) => s.parse().ok(),
                _ => None,
            })
            .collect::<Vec<_>>();
        Some((outcomes, prices))
    }
}

fn loose_array(v: &serde_json::Value) -> Option<Vec<serde_json::Value>> {
    match v {
        serde_json::Value::Array(a) => Some(a.clone()),
        serde_json::Value::String(s) => serde_json::from_str(s).ok(),
        _ => None,
    }
}

/// `"{outcome}: {pct}% | {outcome2}: {pct2}%"` from the first market.
pub fn odds_summary(event: &PolymarketEvent) -> Option<String> {
    let (outcomes, prices) = event.first_market_outcomes()?;
    let parts: Vec<String> = outcomes
        .iter()
        .zip(prices.iter())
        .map(|(name, price)| format!("{}: {}%", name, (price * 100.0).round() as i64))
        .collect();
    (!parts.is_empty()).then(|| parts.join(" | "))
}

pub fn parse_events(json: &serde_json::Value) -> Result<Vec<PolymarketEvent>> {
    let events: Vec<PolymarketEvent> =
        serde_json::from_value(json.clone()).context("parsing polymarket events json")?;
    counter!("ingest_events_total").increment(events.len() as u64);
    Ok(events)
}

/// Build the normalized prediction record for one surviving event.
pub fn normalize(event: &PolymarketEvent, now: DateTime<Utc>) -> NormalizedItem {
    let slug = event.slug.clone().unwrap_or_else(|| event.id.clone());
    NormalizedItem {
        external_id: format!("polymarket:{}", event.id),
        content_type: ContentType::Prediction,
        title: event.title.clone().unwrap_or_default(),
        summary: odds_summary(event),
        content: event.description.clone(),
        url: format!("https://polymarket.com/event/{slug}"),
        thumbnail_url: event.image.clone(),
        author: None,
        published_at: event
            .created_at
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        duration_seconds: None,
        metadata: ItemMetadata::Polymarket {
            volume: event.volume,
            volume_24hr: event.volume24hr,
            liquidity: event.liquidity,
            end_date: event.end_date.clone(),
            markets: event.markets.clone(),
            tags: event.tags.clone(),
            last_updated: Some(now),
        },
    }
}
