//! Live feed fetcher backed by the CoinGecko API.
//!
//! The trending endpoint does not carry news text, so each trending coin is
//! turned into a short placeholder article ("Trending: Bitcoin (BTC)") whose
//! only token is the coin's symbol. When `include_coin_news` is set, the
//! per-coin news endpoint is queried as well; that endpoint is unavailable on
//! the free API tier, so every failure there degrades to "no articles".
//!
//! Requests issued by one fetcher are spaced at least `rate_limit_ms` apart.
//! The API key, if any, comes from `COINGECKO_API_KEY`.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::config::LiveFeedConfig;
use crate::models::{normalize_tokens, NewArticle};
use crate::traits::ArticleSource;

pub const TRENDING_SOURCE: &str = "CoinGecko Trending";
pub const NEWS_SOURCE: &str = "CoinGecko";

/// Symbols recognized when scanning free text for token mentions.
const KNOWN_TOKENS: &[&str] = &[
    "BTC", "ETH", "SOL", "USDT", "USDC", "BNB", "ADA", "XRP", "DOGE", "DOT", "AVAX", "MATIC",
    "LINK", "UNI", "LTC", "BCH", "ATOM",
];

const TOKEN_ALIASES: &[(&str, &str)] = &[("BITCOIN", "BTC"), ("ETHEREUM", "ETH"), ("SOLANA", "SOL")];

#[derive(Debug, Default, Deserialize)]
pub struct TrendingResponse {
    #[serde(default)]
    pub coins: Vec<TrendingCoin>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendingCoin {
    #[serde(default)]
    pub item: CoinItem,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct CoinItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub market_cap_rank: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CoinNewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

/// Build the placeholder article for one trending coin.
pub fn trending_article(coin: &CoinItem, now: DateTime<Utc>) -> NewArticle {
    let name = coin.name.as_deref().unwrap_or("Unknown");
    let symbol = coin.symbol.as_deref().unwrap_or("").trim().to_uppercase();
    let rank = coin
        .market_cap_rank
        .map(|r| r.to_string())
        .unwrap_or_else(|| "N/A".to_string());

    NewArticle {
        title: format!("Trending: {} ({})", name, symbol),
        content: Some(format!("Coin {} is trending with rank #{}", name, rank)),
        source: Some(TRENDING_SOURCE.to_string()),
        url: Some(format!("https://www.coingecko.com/en/coins/{}", coin.id)),
        published_at: Some(now),
        tokens: normalize_tokens([symbol]),
        s3_bucket_source: None,
        s3_key_source: None,
    }
}

/// Convert one per-coin news item; `None` when it has no title.
pub fn news_article(item: &CoinNewsItem) -> Option<NewArticle> {
    let title = item.title.trim();
    if title.is_empty() {
        return None;
    }
    let content = item.content.clone().unwrap_or_default();
    let published_at = item
        .published_at
        .as_deref()
        .map(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|e| {
                    tracing::warn!(date = %raw, error = %e, "could not parse published_at, using current time");
                    Utc::now()
                })
        });

    Some(NewArticle {
        title: title.to_string(),
        tokens: extract_known_tokens(&format!("{} {}", title, content)),
        content: Some(content),
        source: Some(item.source.clone().unwrap_or_else(|| NEWS_SOURCE.to_string())),
        url: item.url.clone(),
        published_at,
        s3_bucket_source: None,
        s3_key_source: None,
    })
}

/// Whole-word scan for known symbols (and a few full names) in free text.
pub fn extract_known_tokens(text: &str) -> Vec<String> {
    let found = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_uppercase())
        .filter_map(|w| {
            if let Some((_, sym)) = TOKEN_ALIASES.iter().find(|(alias, _)| *alias == w) {
                Some(sym.to_string())
            } else if KNOWN_TOKENS.contains(&w.as_str()) {
                Some(w)
            } else {
                None
            }
        });
    normalize_tokens(found)
}

/// Enforces a minimum interval between consecutive requests.
pub struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    /// Wait until a request may be issued, then record it.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

pub struct LiveFeedFetcher {
    base_url: String,
    api_key: Option<String>,
    include_coin_news: bool,
    client: reqwest::Client,
    throttle: Throttle,
}

impl LiveFeedFetcher {
    pub fn new(config: &LiveFeedConfig) -> Result<Self> {
        let api_key = std::env::var("COINGECKO_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &LiveFeedConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            include_coin_news: config.include_coin_news,
            client,
            throttle: Throttle::new(Duration::from_millis(config.rate_limit_ms)),
        })
    }

    async fn request<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        self.throttle.wait().await;

        let url = format!("{}{}", self.base_url, endpoint);
        let mut req = self.client.get(&url);
        if let Some(ref key) = self.api_key {
            req = req.header("x-cg-demo-api-key", key);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("Request to {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "CoinGecko API error {}: {}",
                status,
                body.chars().take(500).collect::<String>()
            );
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))
    }

    /// Currently trending coins; empty on any failure.
    pub async fn fetch_trending_coins(&self) -> Vec<CoinItem> {
        match self.request::<TrendingResponse>("/search/trending").await {
            Ok(resp) => resp.coins.into_iter().map(|c| c.item).collect(),
            Err(e) => {
                tracing::error!(error = %format!("{:#}", e), "error fetching trending coins");
                Vec::new()
            }
        }
    }

    /// News for one coin; empty on any failure (often a paid-tier endpoint).
    pub async fn fetch_coin_news(&self, coin_id: &str) -> Vec<NewArticle> {
        let endpoint = format!("/coins/{}/news", coin_id);
        match self.request::<Vec<CoinNewsItem>>(&endpoint).await {
            Ok(items) => {
                let articles: Vec<NewArticle> = items.iter().filter_map(news_article).collect();
                tracing::info!(coin = %coin_id, count = articles.len(), "fetched coin news");
                articles
            }
            Err(e) => {
                tracing::warn!(coin = %coin_id, error = %format!("{:#}", e), "could not fetch coin news (may require paid plan)");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ArticleSource for LiveFeedFetcher {
    fn name(&self) -> &str {
        "live"
    }

    async fn produce(&self) -> Result<Vec<NewArticle>> {
        let coins = self.fetch_trending_coins().await;
        let now = Utc::now();

        let mut articles: Vec<NewArticle> =
            coins.iter().map(|coin| trending_article(coin, now)).collect();
        tracing::info!(count = articles.len(), "fetched trending items from CoinGecko");

        if self.include_coin_news {
            for coin in coins.iter().filter(|c| !c.id.is_empty()) {
                articles.extend(self.fetch_coin_news(&coin.id).await);
            }
        }

        Ok(articles)
    }
}
