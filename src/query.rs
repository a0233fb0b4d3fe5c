//! Query service: filtered listing and sentiment aggregation.
//!
//! Read-only. Listing is newest first (`created_at DESC`, ties by id) with
//! `limit` in `[1, 100]` (default 10) and a non-negative `offset`.
//!
//! Aggregation over the articles matching an optional token:
//!
//! - `sentiment_distribution`: count per label, unscored articles excluded;
//! - `average_confidence`: mean over scored articles, `0` when none;
//! - `overall_sentiment`: label with the highest count, ties resolved in the
//!   order bullish, bearish, neutral; `neutral` when nothing is scored;
//! - `token_mentions`: how many matching articles mention each symbol.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::models::{Article, Sentiment};
use crate::store::{ArticleFilter, ArticleStore};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Caller input rejected before touching the store.
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("limit must be between 1 and 100, got {0}")]
    InvalidLimit(i64),
    #[error("offset must not be negative, got {0}")]
    NegativeOffset(i64),
    #[error("{0}")]
    InvalidSentiment(String),
}

/// Raw listing parameters, as received from the query string or CLI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub sentiment: Option<String>,
    pub token: Option<String>,
}

/// Validated listing request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter_sentiment: Option<Sentiment>,
    pub filter_token: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl ListParams {
    pub fn validate(&self) -> Result<ListQuery, QueryError> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(QueryError::InvalidLimit(limit));
        }
        let offset = self.offset.unwrap_or(0);
        if offset < 0 {
            return Err(QueryError::NegativeOffset(offset));
        }
        let filter_sentiment = match non_blank(self.sentiment.as_deref()) {
            Some(raw) => Some(
                raw.parse::<Sentiment>()
                    .map_err(QueryError::InvalidSentiment)?,
            ),
            None => None,
        };

        Ok(ListQuery {
            filter_sentiment,
            filter_token: non_blank(self.token.as_deref()).map(|t| t.to_uppercase()),
            limit,
            offset,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub articles: Vec<Article>,
    /// All rows matching the filter, ignoring pagination.
    pub total_count: i64,
    pub limit: i64,
    pub offset: i64,
}

pub async fn list_articles(store: &ArticleStore, query: &ListQuery) -> Result<ListResponse> {
    let filter = ArticleFilter {
        sentiment: query.filter_sentiment,
        token: query.filter_token.clone(),
    };
    let articles = store.list(&filter, query.limit, query.offset).await?;
    let total_count = store.count(&filter).await?;

    Ok(ListResponse {
        articles,
        total_count,
        limit: query.limit,
        offset: query.offset,
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SentimentDistribution {
    pub bullish: usize,
    pub bearish: usize,
    pub neutral: usize,
}

impl SentimentDistribution {
    fn get(&self, label: Sentiment) -> usize {
        match label {
            Sentiment::Bullish => self.bullish,
            Sentiment::Bearish => self.bearish,
            Sentiment::Neutral => self.neutral,
        }
    }

    fn add(&mut self, label: Sentiment) {
        match label {
            Sentiment::Bullish => self.bullish += 1,
            Sentiment::Bearish => self.bearish += 1,
            Sentiment::Neutral => self.neutral += 1,
        }
    }

    fn total(&self) -> usize {
        self.bullish + self.bearish + self.neutral
    }

    /// Label with the highest count; earlier labels in [`Sentiment::ALL`] win ties.
    pub fn dominant(&self) -> Sentiment {
        if self.total() == 0 {
            return Sentiment::Neutral;
        }
        let mut best = Sentiment::ALL[0];
        for label in Sentiment::ALL {
            if self.get(label) > self.get(best) {
                best = label;
            }
        }
        best
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentSummary {
    pub token: Option<String>,
    pub total_articles: usize,
    pub sentiment_distribution: SentimentDistribution,
    pub average_confidence: f64,
    pub overall_sentiment: Sentiment,
    pub token_mentions: BTreeMap<String, usize>,
}

/// Aggregate a set of already-filtered articles.
pub fn summarize(token: Option<String>, articles: &[Article]) -> SentimentSummary {
    let mut distribution = SentimentDistribution::default();
    let mut confidence_sum = 0.0;
    let mut confidence_count = 0usize;
    let mut token_mentions: BTreeMap<String, usize> = BTreeMap::new();

    for article in articles {
        if let Some(label) = article.sentiment {
            distribution.add(label);
            if let Some(score) = article.confidence_score {
                confidence_sum += score;
                confidence_count += 1;
            }
        }
        for symbol in &article.tokens {
            *token_mentions.entry(symbol.clone()).or_insert(0) += 1;
        }
    }

    let average_confidence = if confidence_count == 0 {
        0.0
    } else {
        confidence_sum / confidence_count as f64
    };

    SentimentSummary {
        token,
        total_articles: articles.len(),
        overall_sentiment: distribution.dominant(),
        sentiment_distribution: distribution,
        average_confidence,
        token_mentions,
    }
}

pub async fn sentiment_summary(store: &ArticleStore, token: Option<&str>) -> Result<SentimentSummary> {
    let token = non_blank(token).map(|t| t.to_uppercase());
    let filter = ArticleFilter {
        sentiment: None,
        token: token.clone(),
    };
    let articles = store.all_matching(&filter).await?;
    Ok(summarize(token, &articles))
}
