//! SQLite-backed article store.
//!
//! [`ArticleStore`] is the single store-access object of the process. It is
//! constructed once at startup and handed to every component (importers,
//! enricher, query service, HTTP state). Each batch write runs inside its own
//! transaction: either every staged row commits or none does.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{normalize_tokens, Article, NewArticle, Sentiment};

/// Result of analyzing one article, staged for the batch write.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentUpdate {
    pub id: i64,
    pub sentiment: Sentiment,
    pub confidence: f64,
    pub tokens: Vec<String>,
}

/// Row filter shared by listing, counting, and aggregation.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub sentiment: Option<Sentiment>,
    /// Exact match against one entry of the (upper-cased) token list.
    pub token: Option<String>,
}

impl ArticleFilter {
    fn where_clause(&self) -> String {
        let mut clauses = Vec::new();
        if self.sentiment.is_some() {
            clauses.push("sentiment = ?");
        }
        if self.token.is_some() {
            clauses.push(
                "EXISTS (SELECT 1 FROM json_each(articles.tokens_json) WHERE json_each.value = ?)",
            );
        }
        if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        }
    }

    fn binds(&self) -> Vec<String> {
        let mut binds = Vec::new();
        if let Some(s) = self.sentiment {
            binds.push(s.as_str().to_string());
        }
        if let Some(ref t) = self.token {
            binds.push(t.trim().to_uppercase());
        }
        binds
    }
}

const ARTICLE_COLUMNS: &str = "id, title, content, source, url, published_at, tokens_json, \
     sentiment, confidence_score, s3_bucket_source, s3_key_source, created_at";

pub struct ArticleStore {
    pool: SqlitePool,
}

impl ArticleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Insert every article whose (title, source) pair is not already stored.
    ///
    /// The whole batch shares one transaction. Duplicates (against the table
    /// or earlier rows of the same batch) are skipped; any insert failure
    /// rolls the batch back and is returned to the caller.
    pub async fn insert_new(&self, articles: &[NewArticle]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().timestamp();
        let mut saved = 0usize;

        for article in articles {
            let existing: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM articles WHERE title = ? AND source IS ? LIMIT 1",
            )
            .bind(&article.title)
            .bind(&article.source)
            .fetch_optional(&mut *tx)
            .await?;

            if existing.is_some() {
                tracing::info!(title = %article.title, "article already exists");
                continue;
            }

            let tokens_json = serde_json::to_string(&normalize_tokens(&article.tokens))?;
            sqlx::query(
                r#"
                INSERT INTO articles (title, content, source, url, published_at, tokens_json,
                                      s3_bucket_source, s3_key_source, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&article.title)
            .bind(&article.content)
            .bind(&article.source)
            .bind(&article.url)
            .bind(article.published_at.map(|t| t.timestamp()))
            .bind(&tokens_json)
            .bind(&article.s3_bucket_source)
            .bind(&article.s3_key_source)
            .bind(now)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert article '{}'", article.title))?;

            saved += 1;
        }

        tx.commit().await?;
        Ok(saved)
    }

    /// All articles that have not been scored yet, oldest first.
    pub async fn unscored(&self) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles WHERE sentiment IS NULL ORDER BY id ASC",
            ARTICLE_COLUMNS
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(row_to_article).collect()
    }

    /// Write a batch of sentiment results in one transaction.
    pub async fn apply_sentiment(&self, updates: &[SentimentUpdate]) -> Result<usize> {
        let mut tx = self.pool.begin().await?;
        let mut updated = 0usize;

        for update in updates {
            let tokens_json = serde_json::to_string(&normalize_tokens(&update.tokens))?;
            sqlx::query(
                "UPDATE articles SET sentiment = ?, confidence_score = ?, tokens_json = ? WHERE id = ?",
            )
            .bind(update.sentiment.as_str())
            .bind(update.confidence)
            .bind(&tokens_json)
            .bind(update.id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to update article {}", update.id))?;
            updated += 1;
        }

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Article>> {
        let sql = format!("SELECT {} FROM articles WHERE id = ?", ARTICLE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_article).transpose()
    }

    /// One page of matching articles, newest first.
    pub async fn list(&self, filter: &ArticleFilter, limit: i64, offset: i64) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            ARTICLE_COLUMNS,
            filter.where_clause()
        );
        let mut query = sqlx::query(&sql);
        for value in filter.binds() {
            query = query.bind(value);
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_article).collect()
    }

    /// Every matching article, unpaginated.
    pub async fn all_matching(&self, filter: &ArticleFilter) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM articles {} ORDER BY created_at DESC, id DESC",
            ARTICLE_COLUMNS,
            filter.where_clause()
        );
        let mut query = sqlx::query(&sql);
        for value in filter.binds() {
            query = query.bind(value);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_article).collect()
    }

    pub async fn count(&self, filter: &ArticleFilter) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM articles {}", filter.where_clause());
        let mut query = sqlx::query_scalar::<_, i64>(&sql);
        for value in filter.binds() {
            query = query.bind(value);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }
}

fn ts_to_datetime(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn row_to_article(row: &SqliteRow) -> Result<Article> {
    let tokens_json: String = row.try_get("tokens_json")?;
    let tokens: Vec<String> = serde_json::from_str(&tokens_json).unwrap_or_default();
    let sentiment: Option<String> = row.try_get("sentiment")?;
    let published_at: Option<i64> = row.try_get("published_at")?;
    let created_at: i64 = row.try_get("created_at")?;

    Ok(Article {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        source: row.try_get("source")?,
        url: row.try_get("url")?,
        published_at: published_at.and_then(ts_to_datetime),
        tokens,
        sentiment: sentiment.and_then(|s| s.parse().ok()),
        confidence_score: row.try_get("confidence_score")?,
        s3_bucket_source: row.try_get("s3_bucket_source")?,
        s3_key_source: row.try_get("s3_key_source")?,
        created_at: ts_to_datetime(created_at).unwrap_or_default(),
    })
}
