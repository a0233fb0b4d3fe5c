//! Archive importer.
//!
//! Reads a JSON manifest describing archived articles, downloads each
//! referenced object, extracts its text, and builds a [`NewArticle`] with
//! provenance pointing back at the bucket/key.
//!
//! # Manifest
//!
//! ```json
//! {
//!   "s3_bucket": "crypto-news-pdfs-sep-2025",
//!   "articles": [
//!     {
//!       "title": "Bitcoin ETF inflows hit record",
//!       "source": "CoinDesk",
//!       "s3_key": "2025-09/btc-etf.pdf",
//!       "published_date": "2025-09-03",
//!       "tokens": ["BTC"]
//!     }
//!   ]
//! }
//! ```
//!
//! `s3_bucket` is optional; `[archive].bucket` is used when it is absent.
//!
//! # Failure policy
//!
//! A manifest that cannot be read or parsed fails the whole run. A single
//! entry that cannot be downloaded or extracted is logged and skipped.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ArchiveConfig;
use crate::extract::{content_type_for_key, extract_text};
use crate::models::{normalize_tokens, NewArticle};
use crate::traits::{ArticleSource, ObjectStore};

#[derive(Debug, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub s3_bucket: Option<String>,
    #[serde(default)]
    pub articles: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub source: Option<String>,
    pub s3_key: String,
    #[serde(default)]
    pub published_date: Option<String>,
    #[serde(default)]
    pub tokens: Vec<String>,
}

pub fn load_manifest(path: &std::path::Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read archive manifest: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse archive manifest: {}", path.display()))
}

/// Parse a `YYYY-MM-DD` date as midnight UTC.
///
/// Missing or malformed dates fall back to the current time with a warning.
pub fn parse_published_date(date: Option<&str>) -> DateTime<Utc> {
    let Some(raw) = date else {
        tracing::warn!("published_date missing, using current time");
        return Utc::now();
    };
    match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") {
        Ok(day) => day.and_time(NaiveTime::MIN).and_utc(),
        Err(e) => {
            tracing::warn!(date = %raw, error = %e, "could not parse published_date, using current time");
            Utc::now()
        }
    }
}

pub struct ArchiveImporter {
    manifest_path: PathBuf,
    default_bucket: String,
    objects: Arc<dyn ObjectStore>,
}

impl ArchiveImporter {
    pub fn new(config: &ArchiveConfig, objects: Arc<dyn ObjectStore>) -> Self {
        Self {
            manifest_path: config.manifest.clone(),
            default_bucket: config.bucket.clone(),
            objects,
        }
    }

    async fn import_entry(&self, bucket: &str, entry: &ManifestEntry) -> Result<NewArticle> {
        let bytes = self
            .objects
            .get_object(bucket, &entry.s3_key)
            .await
            .with_context(|| format!("Failed to download s3://{}/{}", bucket, entry.s3_key))?;

        let content = extract_text(&bytes, content_type_for_key(&entry.s3_key))
            .with_context(|| format!("Failed to extract text from {}", entry.s3_key))?;

        Ok(NewArticle {
            title: entry.title.trim().to_string(),
            content: Some(content),
            source: entry.source.clone(),
            url: None,
            published_at: Some(parse_published_date(entry.published_date.as_deref())),
            tokens: normalize_tokens(&entry.tokens),
            s3_bucket_source: Some(bucket.to_string()),
            s3_key_source: Some(entry.s3_key.clone()),
        })
    }
}

#[async_trait]
impl ArticleSource for ArchiveImporter {
    fn name(&self) -> &str {
        "archive"
    }

    async fn produce(&self) -> Result<Vec<NewArticle>> {
        let manifest = load_manifest(&self.manifest_path)?;
        let bucket = manifest
            .s3_bucket
            .as_deref()
            .filter(|b| !b.trim().is_empty())
            .unwrap_or(&self.default_bucket)
            .to_string();

        let mut articles = Vec::new();
        for entry in &manifest.articles {
            if entry.title.trim().is_empty() {
                tracing::warn!(key = %entry.s3_key, "manifest entry has no title, skipping");
                continue;
            }
            match self.import_entry(&bucket, entry).await {
                Ok(article) => {
                    tracing::info!(title = %article.title, "processed archived article");
                    articles.push(article);
                }
                Err(e) => {
                    tracing::error!(title = %entry.title, error = %format!("{:#}", e), "failed to process archived article");
                }
            }
        }

        tracing::info!(
            processed = articles.len(),
            listed = manifest.articles.len(),
            "archive import finished"
        );
        Ok(articles)
    }
}
