//! Ingestion pipeline: source → staged batch → store.
//!
//! A source tolerates per-item failures while producing; whatever it returns
//! is persisted by [`ArticleStore::insert_new`] under a single transaction.
//! Articles whose (title, source) pair is already stored are skipped.

use anyhow::{Context, Result};

use crate::store::ArticleStore;
use crate::traits::ArticleSource;

/// Outcome of one ingestion run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub source: String,
    /// Candidates produced by the source.
    pub produced: usize,
    /// Rows actually inserted (duplicates excluded).
    pub saved: usize,
}

impl IngestSummary {
    pub fn print(&self) {
        println!("ingest {}", self.source);
        println!("  produced: {} articles", self.produced);
        println!("  saved: {}", self.saved);
        println!("  skipped (duplicates): {}", self.produced - self.saved);
        println!("ok");
    }
}

pub async fn run_source(store: &ArticleStore, source: &dyn ArticleSource) -> Result<IngestSummary> {
    let articles = source
        .produce()
        .await
        .with_context(|| format!("Source '{}' failed", source.name()))?;

    let saved = match store.insert_new(&articles).await {
        Ok(saved) => saved,
        Err(e) => {
            tracing::error!(
                source = %source.name(),
                error = %format!("{:#}", e),
                "batch rolled back"
            );
            return Err(e);
        }
    };

    tracing::info!(
        source = %source.name(),
        produced = articles.len(),
        saved,
        "ingestion finished"
    );

    Ok(IngestSummary {
        source: source.name().to_string(),
        produced: articles.len(),
        saved,
    })
}
