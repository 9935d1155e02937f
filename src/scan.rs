// src/scan.rs
//! Best-effort text scanner: targeted substring extraction from HTML and
//! feed snippets via regex. Deliberately not a DOM parser — the callers only
//! need single attributes out of otherwise uninteresting markup, and keeping
//! the brittle parts in one module keeps them independently testable.

use once_cell::sync::OnceCell;
use regex::Regex;

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("scan regex"))
}

/// Decode HTML entities (named plus `&#NNN;`/`&#xHH;` numeric escapes).
pub fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).to_string()
}

/// Strip tags, decode entities, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let mut out = decode_entities(s);

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    out = re(&RE_TAGS, r"(?is)</?[^>]+>").replace_all(&out, " ").to_string();

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    out = re(&RE_WS, r"\s+").replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Truncate on a char boundary to at most `max` chars, the trailing
/// ellipsis included in the budget when a cut happens.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// First `<img src="...">` inside an HTML snippet.
pub fn first_img_src(html: &str) -> Option<String> {
    static RE_IMG: OnceCell<Regex> = OnceCell::new();
    re(&RE_IMG, r#"(?is)<img[^>]+src=["']([^"']+)["']"#)
        .captures(html)
        .map(|c| c[1].to_string())
}

/// `og:image` meta tag, either attribute order.
pub fn og_image(html: &str) -> Option<String> {
    static RE_OG_A: OnceCell<Regex> = OnceCell::new();
    static RE_OG_B: OnceCell<Regex> = OnceCell::new();
    re(
        &RE_OG_A,
        r#"(?is)<meta[^>]+property=["']og:image["'][^>]+content=["']([^"']+)["']"#,
    )
    .captures(html)
    .or_else(|| {
        re(
            &RE_OG_B,
            r#"(?is)<meta[^>]+content=["']([^"']+)["'][^>]+property=["']og:image["']"#,
        )
        .captures(html)
    })
    .map(|c| c[1].to_string())
}

/// Page `<title>`.
pub fn page_title(html: &str) -> Option<String> {
    static RE_TITLE: OnceCell<Regex> = OnceCell::new();
    re(&RE_TITLE, r"(?is)<title[^>]*>(.*?)</title>")
        .captures(html)
        .map(|c| clean_text(&c[1]))
        .filter(|t| !t.is_empty())
}

/// A feed `<link>` tag found in page HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedLinkTag {
    pub href: String,
    pub title: Option<String>,
    pub is_atom: bool,
}

/// Scan HTML for `<link type="application/rss+xml">` / `atom+xml` tags.
pub fn feed_link_tags(html: &str) -> Vec<FeedLinkTag> {
    static RE_LINK: OnceCell<Regex> = OnceCell::new();
    static RE_TYPE: OnceCell<Regex> = OnceCell::new();
    static RE_HREF: OnceCell<Regex> = OnceCell::new();
    static RE_TTL: OnceCell<Regex> = OnceCell::new();

    let link_re = re(&RE_LINK, r"(?is)<link\b[^>]*>");
    let type_re = re(
        &RE_TYPE,
        r#"(?i)type=["']application/(rss|atom)\+xml["']"#,
    );
    let href_re = re(&RE_HREF, r#"(?i)href=["']([^"']+)["']"#);
    let title_re = re(&RE_TTL, r#"(?i)title=["']([^"']+)["']"#);

    let mut out = Vec::new();
    for m in link_re.find_iter(html) {
        let tag = m.as_str();
        let Some(kind) = type_re.captures(tag) else {
            continue;
        };
        let Some(href) = href_re.captures(tag) else {
            continue;
        };
        out.push(FeedLinkTag {
            href: href[1].to_string(),
            title: title_re.captures(tag).map(|c| decode_entities(&c[1])),
            is_atom: kind[1].eq_ignore_ascii_case("atom"),
        });
    }
    out
}

/// Feed-level `<title>` inside `<channel>` (RSS) or `<feed>` (Atom),
/// unwrapping CDATA.
pub fn feed_title(xml: &str) -> Option<String> {
    static RE_RSS: OnceCell<Regex> = OnceCell::new();
    static RE_ATOM: OnceCell<Regex> = OnceCell::new();
    static RE_CDATA: OnceCell<Regex> = OnceCell::new();

    let raw = re(
        &RE_RSS,
        r"(?is)<channel[^>]*>.*?<title[^>]*>(.*?)</title>",
    )
    .captures(xml)
    .or_else(|| {
        re(&RE_ATOM, r"(?is)<feed[^>]*>.*?<title[^>]*>(.*?)</title>").captures(xml)
    })
    .map(|c| c[1].to_string())?;

    let unwrapped = re(&RE_CDATA, r"(?is)^\s*<!\[CDATA\[(.*?)\]\]>\s*$")
        .captures(&raw)
        .map(|c| c[1].to_string())
        .unwrap_or(raw);
    let cleaned = clean_text(&unwrapped);
    (!cleaned.is_empty()).then_some(cleaned)
}
