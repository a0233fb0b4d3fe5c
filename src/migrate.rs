use anyhow::Result;
use sqlx::SqlitePool;

/// Create the `articles` table and its indexes if they do not exist yet.
///
/// Idempotent; run once at startup before serving or ingesting.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // (title, source) is deliberately not UNIQUE: dedup happens at ingestion.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL CHECK (length(trim(title)) > 0),
            content TEXT,
            source TEXT,
            url TEXT,
            published_at INTEGER,
            tokens_json TEXT NOT NULL DEFAULT '[]',
            sentiment TEXT CHECK (sentiment IS NULL OR sentiment IN ('bullish', 'bearish', 'neutral')),
            confidence_score REAL CHECK (
                confidence_score IS NULL OR (confidence_score >= 0.0 AND confidence_score <= 1.0)
            ),
            s3_bucket_source TEXT,
            s3_key_source TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_title_source ON articles(title, source)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_articles_sentiment ON articles(sentiment)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_articles_created_at ON articles(created_at DESC, id DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
