//! TOML configuration.
//!
//! One file drives every entry point (CLI and HTTP). Secrets are never read
//! from here: AWS credentials and the CoinGecko key come from the environment.
//!
//! ```toml
//! [db]
//! path = "./data/cryptosent.sqlite"
//!
//! [server]
//! bind = "0.0.0.0:8000"
//!
//! [archive]
//! manifest = "./config/news_sources.json"
//! bucket = "crypto-news-pdfs-sep-2025"
//!
//! [live_feed]
//! rate_limit_ms = 1000
//!
//! [model]
//! provider = "bedrock"
//! model = "anthropic.claude-3-haiku-20240307-v1:0"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub live_feed: LiveFeedConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

/// Where the archive importer finds its manifest and objects.
#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,
    /// Bucket used when the manifest does not name one.
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack).
    /// Requests use path-style addressing when set.
    #[serde(default)]
    pub endpoint_url: Option<String>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            bucket: default_bucket(),
            region: default_region(),
            endpoint_url: None,
        }
    }
}

fn default_manifest() -> PathBuf {
    PathBuf::from("./config/news_sources.json")
}
fn default_bucket() -> String {
    "crypto-news-pdfs-sep-2025".to_string()
}
fn default_region() -> String {
    "us-east-1".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LiveFeedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum spacing between consecutive market-data requests.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    /// Also pull per-coin news for every trending coin (best-effort).
    #[serde(default)]
    pub include_coin_news: bool,
}

impl Default for LiveFeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            rate_limit_ms: default_rate_limit_ms(),
            include_coin_news: false,
        }
    }
}

fn default_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_rate_limit_ms() -> u64 {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Base URL of the provider: the Ollama server for `ollama`, or an
    /// endpoint override for `bedrock`.
    #[serde(default)]
    pub url: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            region: default_region(),
            max_tokens: default_max_tokens(),
            url: None,
        }
    }
}

fn default_provider() -> String {
    "bedrock".to_string()
}
fn default_model() -> String {
    "anthropic.claude-3-haiku-20240307-v1:0".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.archive.bucket.trim().is_empty() {
        anyhow::bail!("archive.bucket must not be empty");
    }

    if config.live_feed.timeout_secs == 0 {
        anyhow::bail!("live_feed.timeout_secs must be > 0");
    }

    if config.model.max_tokens == 0 {
        anyhow::bail!("model.max_tokens must be > 0");
    }
    if config.model.model.trim().is_empty() {
        anyhow::bail!("model.model must not be empty");
    }

    match config.model.provider.as_str() {
        "bedrock" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown model provider: '{}'. Must be bedrock or ollama.",
            other
        ),
    }

    Ok(())
}
