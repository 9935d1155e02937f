// src/channel.rs
//! YouTube channel-ID resolution from arbitrary URL shapes.
//!
//! Ordered strategy chain: URL-shape parse (zero network) → public page
//! scrape (zero quota) → Data API by handle → by legacy username → channel
//! search (quota-costing, only with a configured key). Any strategy failure
//! means "try the next one"; exhaustion is `None`, never an error. The
//! caller caches a successful resolution back onto the Source.

use once_cell::sync::OnceCell;
use regex::Regex;
use tracing::debug;

use crate::fetch::TextFetcher;

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// `/channel/UC...` or a bare channel ID
    ChannelId,
    /// `/@handle`
    Handle,
    /// `/c/CustomName`
    Custom,
    /// `/user/LegacyName`
    Username,
}

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("channel regex"))
}

/// Pull an `{identifier, kind}` pair out of the four known YouTube URL shapes.
pub fn parse_identifier(url: &str) -> Option<(String, IdentifierKind)> {
    static RE_CHANNEL: OnceCell<Regex> = OnceCell::new();
    static RE_HANDLE: OnceCell<Regex> = OnceCell::new();
    static RE_CUSTOM: OnceCell<Regex> = OnceCell::new();
    static RE_USER: OnceCell<Regex> = OnceCell::new();

    if let Some(c) = re(&RE_CHANNEL, r"(?i)/channel/([A-Za-z0-9_-]+)").captures(url) {
        return Some((c[1].to_string(), IdentifierKind::ChannelId));
    }
    if let Some(c) = re(&RE_HANDLE, r"(?i)/@([A-Za-z0-9_.\-]+)").captures(url) {
        return Some((c[1].to_string(), IdentifierKind::Handle));
    }
    if let Some(c) = re(&RE_CUSTOM, r"(?i)/c/([^/?#]+)").captures(url) {
        return Some((c[1].to_string(), IdentifierKind::Custom));
    }
    if let Some(c) = re(&RE_USER, r"(?i)/user/([^/?#]+)").captures(url) {
        return Some((c[1].to_string(), IdentifierKind::Username));
    }
    // A raw identifier pasted without a URL.
    let trimmed = url.trim();
    if looks_like_channel_id(trimmed) {
        return Some((trimmed.to_string(), IdentifierKind::ChannelId));
    }
    if !trimmed.is_empty() && !trimmed.contains('/') && !trimmed.contains('.') {
        let handle = trimmed.strip_prefix('@').unwrap_or(trimmed);
        return Some((handle.to_string(), IdentifierKind::Handle));
    }
    None
}

pub fn looks_like_channel_id(s: &str) -> bool {
    s.starts_with("UC") && s.len() >= 20 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// The four known ways a channel ID is embedded in public page HTML.
fn scrape_channel_id(html: &str) -> Option<String> {
    static RE_JSON: OnceCell<Regex> = OnceCell::new();
    static RE_PARAM: OnceCell<Regex> = OnceCell::new();
    static RE_CANON: OnceCell<Regex> = OnceCell::new();
    static RE_BROWSE: OnceCell<Regex> = OnceCell::new();

    let patterns = [
        re(&RE_JSON, r#""channelId"\s*:\s*"(UC[A-Za-z0-9_-]{10,})""#),
        re(&RE_PARAM, r"channel_id=(UC[A-Za-z0-9_-]{10,})"),
        re(
            &RE_CANON,
            r#"<link\s+rel="canonical"\s+href="https://www\.youtube\.com/channel/(UC[A-Za-z0-9_-]{10,})""#,
        ),
        re(&RE_BROWSE, r#""browseId"\s*:\s*"(UC[A-Za-z0-9_-]{10,})""#),
    ];
    patterns
        .iter()
        .find_map(|p| p.captures(html).map(|c| c[1].to_string()))
}

fn page_url(identifier: &str, kind: IdentifierKind) -> String {
    match kind {
        IdentifierKind::ChannelId => format!("https://www.youtube.com/channel/{identifier}"),
        IdentifierKind::Handle => format!("https://www.youtube.com/@{identifier}"),
        IdentifierKind::Custom => format!("https://www.youtube.com/c/{identifier}"),
        IdentifierKind::Username => format!("https://www.youtube.com/user/{identifier}"),
    }
}

async fn api_channels_lookup(
    fetcher: &dyn TextFetcher,
    api_key: &str,
    param: &str,
    value: &str,
) -> Option<String> {
    let url = format!("{API_BASE}/channels?part=id&{param}={value}&key={api_key}");
    let json = fetcher.get_json(&url).await.ok()?;
    json.get("items")?
        .as_array()?
        .first()?
        .get("id")?
        .as_str()
        .map(|s| s.to_string())
}

async fn api_channel_search(
    fetcher: &dyn TextFetcher,
    api_key: &str,
    query: &str,
) -> Option<String> {
    let url = format!(
        "{API_BASE}/search?part=snippet&type=channel&maxResults=1&q={query}&key={api_key}"
    );
    let json = fetcher.get_json(&url).await.ok()?;
    json.get("items")?
        .as_array()?
        .first()?
        .pointer("/snippet/channelId")
        .or_else(|| {
            json.get("items")
                .and_then(|i| i.as_array())
                .and_then(|a| a.first())
                .and_then(|i| i.pointer("/id/channelId"))
        })?
        .as_str()
        .map(|s| s.to_string())
}

/// Resolve a channel ID from any supported URL shape, or None when every
/// strategy is exhausted.
pub async fn resolve_channel_id(
    fetcher: &dyn TextFetcher,
    api_key: Option<&str>,
    url: &str,
) -> Option<String> {
    let (identifier, kind) = parse_identifier(url)?;

    // Already a channel ID: done, zero network.
    if looks_like_channel_id(&identifier) {
        return Some(identifier);
    }

    // Zero-quota page scrape first.
    let page = page_url(&identifier, kind);
    match fetcher.get_text(&page).await {
        Ok(fetched) => {
            if let Some(id) = scrape_channel_id(&fetched.body) {
                debug!(identifier, channel_id = %id, "resolved channel via page scrape");
                return Some(id);
            }
        }
        Err(e) => debug!(error = ?e, identifier, "channel page scrape failed"),
    }

    // Quota-costing API fallbacks, only with a configured key.
    let key = api_key?;
    let handle_value = format!("%40{identifier}");
    if let Some(id) = api_channels_lookup(fetcher, key, "forHandle", &handle_value).await {
        return Some(id);
    }
    if let Some(id) = api_channels_lookup(fetcher, key, "forUsername", &identifier).await {
        return Some(id);
    }
    api_channel_search(fetcher, key, &identifier).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_shapes() {
        assert_eq!(
            parse_identifier("https://www.youtube.com/channel/UCabcdefghijklmnopqrstuv"),
            Some((
                "UCabcdefghijklmnopqrstuv".to_string(),
                IdentifierKind::ChannelId
            ))
        );
        assert_eq!(
            parse_identifier("https://youtube.com/@somehandle"),
            Some(("somehandle".to_string(), IdentifierKind::Handle))
        );
        assert_eq!(
            parse_identifier("https://www.youtube.com/c/CustomName"),
            Some(("CustomName".to_string(), IdentifierKind::Custom))
        );
        assert_eq!(
            parse_identifier("https://www.youtube.com/user/legacy42"),
            Some(("legacy42".to_string(), IdentifierKind::Username))
        );
        assert_eq!(
            parse_identifier("UCabcdefghijklmnopqrstuv"),
            Some((
                "UCabcdefghijklmnopqrstuv".to_string(),
                IdentifierKind::ChannelId
            ))
        );
        assert!(parse_identifier("https://example.test/nothing").is_none());
    }

    #[test]
    fn scrape_patterns_all_hit() {
        let id = "UCabcdefghijklmnopqrstuv";
        let cases = [
            format!(r#"var x = {{"channelId":"{id}"}};"#),
            format!("https://www.youtube.com/feeds/videos.xml?channel_id={id}"),
            format!(r#"<link rel="canonical" href="https://www.youtube.com/channel/{id}">"#),
            format!(r#""browseId":"{id}""#),
        ];
        for html in &cases {
            assert_eq!(scrape_channel_id(html).as_deref(), Some(id), "case: {html}");
        }
        assert!(scrape_channel_id("<html>nothing embedded</html>").is_none());
    }
}
