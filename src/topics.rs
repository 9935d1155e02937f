// src/topics.rs
//! Topic suggestion for a newly added source: keyword/substring scoring of
//! the source's title + description against the user's topic taxonomy.
//! Ties break toward the first-seen topic; a zero score means no suggestion.

use crate::model::Topic;

const SCORE_NAME_MATCH: i32 = 10;
const SCORE_WORD_MATCH: i32 = 3;
const SCORE_ASSOCIATION: i32 = 2;

/// Name words shorter than this are too generic to score.
const MIN_WORD_LEN: usize = 4;

/// Curated associations: when the topic name contains the key, each listed
/// term found in the source text scores.
const ASSOCIATIONS: &[(&str, &[&str])] = &[
    (
        "crypto",
        &["bitcoin", "ethereum", "blockchain", "defi", "solana", "stablecoin", "token"],
    ),
    (
        "politics",
        &["election", "senate", "congress", "president", "policy", "vote", "campaign"],
    ),
    (
        "ai",
        &["artificial intelligence", "machine learning", "llm", "openai", "anthropic", "neural", "chatgpt"],
    ),
    (
        "tech",
        &["startup", "software", "apple", "google", "microsoft", "silicon valley", "gadget"],
    ),
    (
        "finance",
        &["stocks", "markets", "fed", "rates", "inflation", "earnings", "etf"],
    ),
    (
        "economy",
        &["gdp", "inflation", "recession", "unemployment", "tariff", "trade"],
    ),
    (
        "science",
        &["nasa", "research", "physics", "climate", "biology", "space"],
    ),
    (
        "gaming",
        &["nintendo", "playstation", "xbox", "steam", "esports"],
    ),
];

fn score_topic(topic_name: &str, text: &str) -> i32 {
    let name = topic_name.trim().to_lowercase();
    if name.is_empty() {
        return 0;
    }
    let mut score = 0;

    if text.contains(&name) {
        score += SCORE_NAME_MATCH;
    }

    for word in name.split_whitespace() {
        if word.len() >= MIN_WORD_LEN && text.contains(word) {
            score += SCORE_WORD_MATCH;
        }
    }

    for (key, terms) in ASSOCIATIONS {
        if !name.contains(key) {
            continue;
        }
        for term in *terms {
            if text.contains(term) {
                score += SCORE_ASSOCIATION;
            }
        }
    }

    score
}

/// Best-matching topic id for a new source, or None below threshold.
pub fn suggest_topic(title: &str, description: &str, topics: &[Topic]) -> Option<String> {
    let text = format!("{title} {description}").to_lowercase();

    let mut best: Option<(&Topic, i32)> = None;
    for topic in topics {
        let score = score_topic(&topic.name, &text);
        if score <= 0 {
            continue;
        }
        // Strictly-greater keeps the first-seen topic on ties.
        match best {
            Some((_, s)) if score <= s => {}
            _ => best = Some((topic, score)),
        }
    }
    best.map(|(t, _)| t.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topics() -> Vec<Topic> {
        vec![
            Topic {
                id: "t-crypto".into(),
                name: "Crypto".into(),
            },
            Topic {
                id: "t-politics".into(),
                name: "US Politics".into(),
            },
            Topic {
                id: "t-ai".into(),
                name: "AI".into(),
            },
        ]
    }

    #[test]
    fn name_substring_dominates() {
        let got = suggest_topic("The Crypto Roundup", "daily digest", &topics());
        assert_eq!(got.as_deref(), Some("t-crypto"));
    }

    #[test]
    fn associations_score_without_a_name_hit() {
        let got = suggest_topic("Chain Weekly", "bitcoin and ethereum coverage", &topics());
        assert_eq!(got.as_deref(), Some("t-crypto"));
    }

    #[test]
    fn name_words_score_individually() {
        let got = suggest_topic("Politics Today", "beltway news", &topics());
        assert_eq!(got.as_deref(), Some("t-politics"));
    }

    #[test]
    fn zero_score_is_no_suggestion() {
        assert!(suggest_topic("Cooking at home", "sourdough recipes", &topics()).is_none());
    }

    #[test]
    fn ties_break_to_first_seen() {
        let two = vec![
            Topic {
                id: "a".into(),
                name: "Markets".into(),
            },
            Topic {
                id: "b".into(),
                name: "Markets".into(),
            },
        ];
        let got = suggest_topic("Markets wrap", "", &two);
        assert_eq!(got.as_deref(), Some("a"));
    }
}
