// src/config.rs
//! Runtime configuration: optional `config/radar.toml` plus env overrides.
//! Everything has a default so a bare deployment still boots; API keys only
//! ever come from the environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_PATH: &str = "config/radar.toml";
pub const ENV_CONFIG_PATH: &str = "RADAR_CONFIG_PATH";

const ENV_YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
const ENV_TRANSCRIPT_URL: &str = "RADAR_TRANSCRIPT_URL";
const ENV_SCHEDULE_SECS: &str = "RADAR_SCHEDULE_SECS";
const ENV_SCHEDULE_ACCOUNT: &str = "RADAR_SCHEDULE_ACCOUNT";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    /// Per-request fetch timeout; a hanging feed is a per-source failure.
    pub fetch_timeout_secs: u64,
    /// Open Polymarket events pulled per cycle.
    pub polymarket_limit: usize,
    pub summarizer_model: String,

    // Env-only fields, never read from the TOML file.
    #[serde(skip)]
    pub youtube_api_key: Option<String>,
    #[serde(skip)]
    pub openai_api_key: Option<String>,
    #[serde(skip)]
    pub transcript_base_url: Option<String>,
    #[serde(skip)]
    pub schedule: Option<ScheduleConfig>,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub interval_secs: u64,
    pub account_id: String,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: crate::fetch::DEFAULT_FETCH_TIMEOUT_SECS,
            polymarket_limit: 50,
            summarizer_model: "gpt-4o-mini".to_string(),
            youtube_api_key: None,
            openai_api_key: None,
            transcript_base_url: None,
            schedule: None,
        }
    }
}

impl RadarConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing radar config toml")
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Load with the usual fallbacks:
    /// 1) $RADAR_CONFIG_PATH, 2) config/radar.toml, 3) built-in defaults —
    /// then apply env overrides for keys and scheduling.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::from_path(&path)?
        } else {
            Self::default()
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        self.youtube_api_key = env_nonempty(ENV_YOUTUBE_API_KEY);
        self.openai_api_key = env_nonempty(ENV_OPENAI_API_KEY);
        self.transcript_base_url = env_nonempty(ENV_TRANSCRIPT_URL);

        let interval = env_nonempty(ENV_SCHEDULE_SECS).and_then(|v| v.parse::<u64>().ok());
        let account = env_nonempty(ENV_SCHEDULE_ACCOUNT);
        self.schedule = match (interval, account) {
            (Some(interval_secs), Some(account_id)) if interval_secs > 0 => Some(ScheduleConfig {
                interval_secs,
                account_id,
            }),
            _ => None,
        };
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
