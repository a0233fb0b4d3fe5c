//! Capability seams between the pipeline and the outside world.
//!
//! ```text
//! ┌──────────────────┐   ┌──────────────────┐
//! │ ArchiveImporter  │   │ LiveFeedFetcher  │   ArticleSource
//! │  └─ ObjectStore  │   │  └─ CoinGecko    │
//! └────────┬─────────┘   └────────┬─────────┘
//!          └──────────┬───────────┘
//!                     ▼
//!              ingest::run_source ──▶ ArticleStore
//!                                          │
//!              SentimentEnricher ◀─────────┘
//!               └─ TextGenerator
//! ```
//!
//! Production code wires [`S3ObjectStore`](crate::s3::S3ObjectStore) and the
//! providers in [`llm`](crate::llm); tests substitute in-memory doubles.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::NewArticle;

/// Something that produces candidate articles for ingestion.
///
/// Implementations tolerate per-item failures (log and skip) and return an
/// error only when the source as a whole cannot run.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use anyhow::Result;
/// use cryptosent::models::NewArticle;
/// use cryptosent::traits::ArticleSource;
///
/// pub struct FixedSource;
///
/// #[async_trait]
/// impl ArticleSource for FixedSource {
///     fn name(&self) -> &str { "fixed" }
///
///     async fn produce(&self) -> Result<Vec<NewArticle>> {
///         Ok(vec![NewArticle::new("Bitcoin steadies", "Fixed")])
///     }
/// }
/// ```
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Short identifier used in logs and CLI output (e.g. `"archive"`).
    fn name(&self) -> &str;

    /// Build the candidate articles for one run.
    async fn produce(&self) -> Result<Vec<NewArticle>>;
}

/// Read-only object storage: fetch the bytes stored under a key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// A text-generation model: prompt in, free-form text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}
