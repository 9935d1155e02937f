// src/fetch.rs
//! Thin HTTP boundary. Every network touch in the pipeline goes through
//! `TextFetcher`, so tests can substitute recorded responses and assert
//! strategy ordering without sockets.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("radar/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct FetchedBody {
    pub body: String,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait TextFetcher: Send + Sync {
    /// GET a URL and return its body as text. Non-2xx is an error.
    async fn get_text(&self, url: &str) -> Result<FetchedBody>;

    /// GET a URL and parse the body as JSON. Non-2xx is an error.
    async fn get_json(&self, url: &str) -> Result<serde_json::Value>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .context("building http client")?;
        Ok(Self { client })
    }

    pub fn with_default_timeout() -> Result<Self> {
        Self::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS))
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<FetchedBody> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("GET {url}: HTTP {}", resp.status()));
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp.text().await.with_context(|| format!("{url} .text()"))?;
        Ok(FetchedBody { body, content_type })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;
        if !resp.status().is_success() {
            return Err(anyhow!("GET {url}: HTTP {}", resp.status()));
        }
        resp.json().await.with_context(|| format!("{url} .json()"))
    }
}
