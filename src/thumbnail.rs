// src/thumbnail.rs
//! Representative-image extraction from heterogeneous feed item shapes.
//! An explicit ordered strategy list, first match wins, no merging.

use crate::ingest::extract::rss::RssItem;
use crate::scan;

type Strategy = fn(&RssItem) -> Option<String>;

/// Priority order matters: enclosures beat media-RSS, media-RSS beats
/// anything scraped out of embedded HTML.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("enclosure", from_enclosure),
    ("media_thumbnail", from_media_thumbnail),
    ("media_content", from_media_content),
    ("media_group", from_media_group),
    ("image_field", from_image_field),
    ("content_img", from_content_img),
    ("og_image", from_og_image),
];

/// Resolve a thumbnail URL for a feed item, or None. Never errors —
/// callers treat a missing thumbnail as a degraded item, not a failure.
pub fn resolve(item: &RssItem) -> Option<String> {
    STRATEGIES.iter().find_map(|(_, s)| s(item))
}

/// Loose "is this an image URL" heuristic: extension match or a path
/// segment that CMSes put images under.
pub fn looks_like_image(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    let path = lower.split(['?', '#']).next().unwrap_or(&lower);
    const EXTS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".svg"];
    if EXTS.iter().any(|e| path.ends_with(e)) {
        return true;
    }
    const HINTS: &[&str] = &["/images/", "/img/", "/media/", "wp-content/uploads"];
    HINTS.iter().any(|h| lower.contains(h))
}

fn from_enclosure(item: &RssItem) -> Option<String> {
    let enc = item.enclosure.as_ref()?;
    let url = enc.url.clone()?;
    let is_image = enc
        .mime_type
        .as_deref()
        .map(|m| m.starts_with("image/"))
        .unwrap_or(false)
        || looks_like_image(&url);
    is_image.then_some(url)
}

fn from_media_thumbnail(item: &RssItem) -> Option<String> {
    item.media_thumbnail.iter().find_map(|t| t.any_url())
}

fn from_media_content(item: &RssItem) -> Option<String> {
    item.media_content
        .iter()
        .filter_map(|c| c.url.clone())
        .find(|u| looks_like_image(u))
}

fn from_media_group(item: &RssItem) -> Option<String> {
    let group = item.media_group.as_ref()?;
    group
        .media_thumbnail
        .iter()
        .find_map(|t| t.any_url())
        .or_else(|| {
            group
                .media_content
                .iter()
                .filter_map(|c| c.url.clone())
                .find(|u| looks_like_image(u))
        })
}

fn from_image_field(item: &RssItem) -> Option<String> {
    item.image.as_ref().and_then(|i| i.any_url())
}

fn html_fields(item: &RssItem) -> impl Iterator<Item = &str> {
    item.content_encoded
        .as_deref()
        .into_iter()
        .chain(item.description.as_deref())
}

fn from_content_img(item: &RssItem) -> Option<String> {
    html_fields(item).find_map(scan::first_img_src)
}

fn from_og_image(item: &RssItem) -> Option<String> {
    html_fields(item).find_map(scan::og_image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::extract::rss::{Enclosure, ImageField, MediaContent, MediaThumbnail};

    fn item() -> RssItem {
        RssItem::default()
    }

    #[test]
    fn image_heuristic() {
        assert!(looks_like_image("https://x.test/a.JPG"));
        assert!(looks_like_image("https://x.test/a.webp?w=600"));
        assert!(looks_like_image("https://x.test/wp-content/uploads/a"));
        assert!(looks_like_image("https://x.test/img/pic"));
        assert!(!looks_like_image("https://x.test/audio.mp3"));
    }

    #[test]
    fn enclosure_beats_media_thumbnail() {
        let mut it = item();
        it.enclosure = Some(Enclosure {
            url: Some("https://x.test/enc.jpg".into()),
            mime_type: None,
        });
        it.media_thumbnail = vec![MediaThumbnail {
            url: Some("https://x.test/thumb.jpg".into()),
            text: None,
        }];
        assert_eq!(resolve(&it).as_deref(), Some("https://x.test/enc.jpg"));
    }

    #[test]
    fn non_image_enclosure_falls_through() {
        let mut it = item();
        it.enclosure = Some(Enclosure {
            url: Some("https://x.test/episode.mp3".into()),
            mime_type: Some("audio/mpeg".into()),
        });
        it.media_thumbnail = vec![MediaThumbnail {
            url: Some("https://x.test/thumb.jpg".into()),
            text: None,
        }];
        assert_eq!(resolve(&it).as_deref(), Some("https://x.test/thumb.jpg"));
    }

    #[test]
    fn media_content_requires_image_heuristic() {
        let mut it = item();
        it.media_content = vec![
            MediaContent {
                url: Some("https://x.test/clip.mp4".into()),
            },
            MediaContent {
                url: Some("https://x.test/frame.png".into()),
            },
        ];
        assert_eq!(resolve(&it).as_deref(), Some("https://x.test/frame.png"));
    }

    #[test]
    fn image_field_accepts_all_shapes() {
        let mut it = item();
        it.image = Some(ImageField {
            attr_url: None,
            url_child: Some("https://x.test/chan.png".into()),
            text: None,
        });
        assert_eq!(resolve(&it).as_deref(), Some("https://x.test/chan.png"));
    }

    #[test]
    fn content_img_then_og_image_as_last_resorts() {
        let mut it = item();
        it.description = Some(r#"<img src="https://x.test/in-body.gif">"#.into());
        assert_eq!(resolve(&it).as_deref(), Some("https://x.test/in-body.gif"));

        let mut it2 = item();
        it2.content_encoded = Some(
            r#"<meta property="og:image" content="https://x.test/og.png"> no img tag"#.into(),
        );
        assert_eq!(resolve(&it2).as_deref(), Some("https://x.test/og.png"));
    }

    #[test]
    fn empty_item_resolves_to_none() {
        assert!(resolve(&item()).is_none());
    }
}
