// src/filter.rs
//! Per-source Polymarket filter policy: sports exclusion plus
//! keyword/category inclusion. Pure batch transform — deterministic and
//! independent of fetch order.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ingest::extract::polymarket::PolymarketEvent;
use crate::model::FilterPolicy;

/// Fixed bank of sports patterns tested against title + description.
/// League, sport, and marquee-event names; case-insensitive, word-bounded
/// where short tokens would otherwise false-positive.
static SPORTS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    const PATTERNS: &[&str] = &[
        r"\bnba\b",
        r"\bnfl\b",
        r"\bmlb\b",
        r"\bnhl\b",
        r"\bncaa\b",
        r"\bufc\b",
        r"\bmma\b",
        r"\bwnba\b",
        r"\bepl\b",
        r"\bfifa\b",
        r"\buefa\b",
        r"\bf1\b",
        r"formula\s*1",
        r"\bnascar\b",
        r"premier league",
        r"champions league",
        r"la liga",
        r"serie a",
        r"bundesliga",
        r"ligue 1",
        r"world cup",
        r"super bowl",
        r"stanley cup",
        r"world series",
        r"grand slam",
        r"wimbledon",
        r"us open",
        r"french open",
        r"australian open",
        r"heisman",
        r"playoffs?\b",
        r"\bolympics?\b",
        r"march madness",
        r"home run",
        r"touchdown",
        r"\bgoalscorer\b",
        r"golden boot",
        r"\bmvp\b",
    ];
    PATTERNS
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).expect("sports pattern"))
        .collect()
});

/// True when any sports pattern matches the text.
pub fn is_sports(text: &str) -> bool {
    SPORTS_PATTERNS.iter().any(|re| re.is_match(text))
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    !needle.is_empty() && haystack.to_lowercase().contains(&needle)
}

/// Inclusion check with OR-across-dimensions semantics:
/// - empty keywords AND empty categories ⇒ everything passes (vacuously true);
/// - otherwise the event passes if any keyword substring-matches the text,
///   OR any category substring-matches a tag slug/label or the text.
///
/// An empty list is vacuously true only when *both* lists are empty; once at
/// least one list is populated, only populated lists can grant a pass.
fn matches_inclusion(event: &PolymarketEvent, policy: &FilterPolicy) -> bool {
    if policy.keywords.is_empty() && policy.categories.is_empty() {
        return true;
    }
    let text = event.searchable_text();

    let keyword_hit = !policy.keywords.is_empty()
        && policy.keywords.iter().any(|k| contains_ci(&text, k));
    if keyword_hit {
        return true;
    }

    if policy.categories.is_empty() {
        return false;
    }
    let tags = event.tag_texts();
    policy.categories.iter().any(|c| {
        let c = c.trim().to_lowercase();
        !c.is_empty() && (tags.iter().any(|t| t.contains(&c)) || text.to_lowercase().contains(&c))
    })
}

/// Apply the policy to a batch. Returns survivors plus the filtered-out count.
pub fn filter_events(
    events: Vec<PolymarketEvent>,
    policy: &FilterPolicy,
) -> (Vec<PolymarketEvent>, usize) {
    let before = events.len();
    let kept: Vec<PolymarketEvent> = events
        .into_iter()
        .filter(|e| !(policy.exclude_sports && is_sports(&e.searchable_text())))
        .filter(|e| matches_inclusion(e, policy))
        .collect();
    let filtered = before - kept.len();
    (kept, filtered)
}
