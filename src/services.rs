// src/services.rs
//! External collaborators: transcript lookup and AI summarization.
//! Both are best-effort — "unavailable" is `None`, never an error, so a
//! missing transcript can never fail a video item.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

/// Fetches a transcript for a YouTube video. Returns None when no
/// transcript exists or the service is unreachable.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    async fn transcript(&self, video_id: &str) -> Option<String>;
}

/// Summarizes long text. Returns None on any failure; the caller falls
/// back to a truncated description.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, text: &str, title: &str) -> Option<String>;
    fn provider_name(&self) -> &'static str;
}

pub type DynTranscript = Arc<dyn TranscriptService>;
pub type DynSummarizer = Arc<dyn Summarizer>;

/* ----------------------------
Disabled defaults
---------------------------- */

pub struct DisabledTranscript;

#[async_trait]
impl TranscriptService for DisabledTranscript {
    async fn transcript(&self, _video_id: &str) -> Option<String> {
        None
    }
}

pub struct DisabledSummarizer;

#[async_trait]
impl Summarizer for DisabledSummarizer {
    async fn summarize(&self, _text: &str, _title: &str) -> Option<String> {
        None
    }
    fn provider_name(&self) -> &'static str {
        "disabled"
    }
}

/* ----------------------------
HTTP implementations
---------------------------- */

/// Transcript sidecar: GET {base}/{video_id}, plain-text body.
pub struct HttpTranscript {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTranscript {
    pub fn new(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl TranscriptService for HttpTranscript {
    async fn transcript(&self, video_id: &str) -> Option<String> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), video_id);
        let resp = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                debug!(error = ?e, video_id, "transcript fetch failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            return None;
        }
        resp.text().await.ok().filter(|t| !t.trim().is_empty())
    }
}

/// Chat-completions summarizer (OpenAI-compatible endpoint).
pub struct OpenAiSummarizer {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiSummarizer {
    pub fn new(client: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            client,
            api_key,
            model,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

#[async_trait]
impl Summarizer for OpenAiSummarizer {
    async fn summarize(&self, text: &str, title: &str) -> Option<String> {
        // Cap the prompt; transcripts can run to hours of speech.
        let body: String = text.chars().take(12_000).collect();
        let payload = json!({
            "model": self.model,
            "messages": [
                {
                    "role": "system",
                    "content": "Summarize the following video transcript in 2-3 sentences. Plain prose, no preamble."
                },
                {
                    "role": "user",
                    "content": format!("Title: {title}\n\nTranscript:\n{body}")
                }
            ],
            "temperature": 0.3,
        });

        let resp = match self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = ?e, "summarizer request failed");
                return None;
            }
        };
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "summarizer non-2xx");
            return None;
        }
        let parsed: ChatResponse = resp.json().await.ok()?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Build collaborators from configuration. Anything unconfigured degrades
/// to the disabled variant.
pub fn build_services(
    client: &reqwest::Client,
    openai_api_key: Option<String>,
    summarizer_model: String,
    transcript_base_url: Option<String>,
) -> (DynTranscript, DynSummarizer) {
    let transcript: DynTranscript = match transcript_base_url {
        Some(base) => Arc::new(HttpTranscript::new(client.clone(), base)),
        None => Arc::new(DisabledTranscript),
    };
    let summarizer: DynSummarizer = match openai_api_key {
        Some(key) => Arc::new(OpenAiSummarizer::new(client.clone(), key, summarizer_model)),
        None => Arc::new(DisabledSummarizer),
    };
    (transcript, summarizer)
}
