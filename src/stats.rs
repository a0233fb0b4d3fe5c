//! Store statistics.
//!
//! Total article count, scored vs. unscored split, and a per-source
//! breakdown. Served by `GET /api/stats/` and printed by `cryptosent stats`.

use anyhow::Result;
use serde::Serialize;
use sqlx::Row;
use std::collections::BTreeMap;

use crate::store::ArticleStore;

/// Key used in `by_source` for articles without a source.
pub const UNKNOWN_SOURCE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsResponse {
    pub total_articles: i64,
    pub with_sentiment: i64,
    pub without_sentiment: i64,
    pub by_source: BTreeMap<String, i64>,
}

pub async fn store_stats(store: &ArticleStore) -> Result<StatsResponse> {
    let pool = store.pool();

    let total_articles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM articles")
        .fetch_one(pool)
        .await?;

    let with_sentiment: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM articles WHERE sentiment IS NOT NULL")
            .fetch_one(pool)
            .await?;

    let source_rows = sqlx::query(
        r#"
        SELECT COALESCE(source, ?) AS source, COUNT(*) AS article_count
        FROM articles
        GROUP BY COALESCE(source, ?)
        "#,
    )
    .bind(UNKNOWN_SOURCE)
    .bind(UNKNOWN_SOURCE)
    .fetch_all(pool)
    .await?;

    let mut by_source = BTreeMap::new();
    for row in &source_rows {
        let source: String = row.try_get("source")?;
        let count: i64 = row.try_get("article_count")?;
        by_source.insert(source, count);
    }

    Ok(StatsResponse {
        total_articles,
        with_sentiment,
        without_sentiment: total_articles - with_sentiment,
        by_source,
    })
}

/// Print a summary for the CLI.
pub fn print_stats(stats: &StatsResponse, db_path: &std::path::Path) {
    let db_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    println!("cryptosent: store stats");
    println!("=======================");
    println!();
    println!("  Database:    {}", db_path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Articles:    {}", stats.total_articles);
    println!(
        "  Scored:      {} / {} ({}%)",
        stats.with_sentiment,
        stats.total_articles,
        if stats.total_articles > 0 {
            (stats.with_sentiment * 100) / stats.total_articles
        } else {
            0
        }
    );

    if !stats.by_source.is_empty() {
        let mut sources: Vec<(&String, &i64)> = stats.by_source.iter().collect();
        sources.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        println!();
        println!("  By source:");
        println!("  {:<32} {:>8}", "SOURCE", "ARTICLES");
        println!("  {}", "-".repeat(41));
        for (source, count) in sources {
            println!("  {:<32} {:>8}", source, count);
        }
    }

    println!();
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
