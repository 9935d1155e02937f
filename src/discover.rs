// src/discover.rs
//! RSS/Atom feed discovery for an arbitrary page URL: direct-URL sniffing,
//! HTML `<link>` tag scanning, then common-path guessing (page path first,
//! site root second).

use reqwest::Url;
use serde::Serialize;
use tracing::debug;

use crate::fetch::TextFetcher;
use crate::model::{DiscoveredFeed, FeedKind};
use crate::scan;

/// Common feed locations, probed in order against the page path and then
/// the site root. Blogger and WordPress get their conventional entries.
const COMMON_PATHS: &[&str] = &[
    "/feed/",
    "/feed",
    "/rss/",
    "/rss.xml",
    "/atom.xml",
    "/index.xml",
    "/feeds/posts/default",
    "?feed=rss2",
];

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    pub feeds: Vec<DiscoveredFeed>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_title: Option<String>,
}

/// Sniff a fetched body: is this already a feed, and which kind?
pub fn classify_feed(body: &str, content_type: Option<&str>) -> Option<FeedKind> {
    let head = body.trim_start();
    let ct_hint = content_type
        .map(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("rss") || ct.contains("atom") || ct.contains("xml")
        })
        .unwrap_or(false);
    let body_hint =
        head.starts_with("<?xml") || head.starts_with("<rss") || head.starts_with("<feed");
    if !ct_hint && !body_hint {
        return None;
    }

    // Content-type alone is not enough (XHTML pages ship as xml); require
    // actual feed markers to classify.
    if head.contains("<rss") || head.contains("<channel") {
        Some(FeedKind::Rss)
    } else if head.contains("<feed") {
        Some(FeedKind::Atom)
    } else {
        None
    }
}

fn normalize_url(raw: &str) -> Option<Url> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("https://{raw}")
    };
    let url = Url::parse(&candidate).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    url.host_str()?;
    Some(url)
}

async fn confirm_feed(fetcher: &dyn TextFetcher, url: &str) -> Option<DiscoveredFeed> {
    let fetched = fetcher.get_text(url).await.ok()?;
    let kind = classify_feed(&fetched.body, fetched.content_type.as_deref())?;
    Some(DiscoveredFeed {
        url: url.to_string(),
        title: scan::feed_title(&fetched.body),
        kind,
    })
}

/// Discover feeds for `page_url`. Invalid input yields an empty result —
/// discovery never errors.
pub async fn discover(fetcher: &dyn TextFetcher, page_url: &str) -> Discovery {
    let Some(url) = normalize_url(page_url) else {
        return Discovery::default();
    };

    // The URL may already be a feed.
    let page = match fetcher.get_text(url.as_str()).await {
        Ok(p) => p,
        Err(e) => {
            debug!(error = ?e, url = %url, "discovery page fetch failed");
            return Discovery::default();
        }
    };
    if let Some(kind) = classify_feed(&page.body, page.content_type.as_deref()) {
        return Discovery {
            feeds: vec![DiscoveredFeed {
                url: url.to_string(),
                title: scan::feed_title(&page.body),
                kind,
            }],
            page_title: None,
        };
    }

    let page_title = scan::page_title(&page.body);

    // Declared feeds in <link> tags, resolved against the page URL.
    let mut feeds = Vec::new();
    for tag in scan::feed_link_tags(&page.body) {
        let Ok(resolved) = url.join(&tag.href) else {
            continue;
        };
        let href = resolved.to_string();
        if feeds.iter().any(|f: &DiscoveredFeed| f.url == href) {
            continue;
        }
        feeds.push(DiscoveredFeed {
            url: href,
            title: tag.title,
            kind: if tag.is_atom {
                FeedKind::Atom
            } else {
                FeedKind::Rss
            },
        });
    }
    if !feeds.is_empty() {
        return Discovery { feeds, page_title };
    }

    // No declared feeds: guess. Page path before site root, first hit wins.
    let origin = format!(
        "{}://{}",
        url.scheme(),
        url.host_str().unwrap_or_default()
    );
    let origin = match url.port() {
        Some(p) => format!("{origin}:{p}"),
        None => origin,
    };
    let path = url.path().trim_end_matches('/');

    let mut bases = Vec::with_capacity(2);
    if !path.is_empty() {
        bases.push(format!("{origin}{path}"));
    }
    bases.push(origin);

    for base in &bases {
        for candidate in COMMON_PATHS {
            let probe = format!("{base}{candidate}");
            if let Some(feed) = confirm_feed(fetcher, &probe).await {
                return Discovery {
                    feeds: vec![feed],
                    page_title,
                };
            }
        }
    }

    Discovery {
        feeds: Vec::new(),
        page_title,
    }
}
