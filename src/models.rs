//! Core data types: the stored [`Article`], the [`NewArticle`] candidate
//! produced by sources, and the [`Sentiment`] label.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Sentiment label assigned by the enricher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    /// All labels, in the order used to break ties when picking a winner.
    pub const ALL: [Sentiment; 3] = [Sentiment::Bullish, Sentiment::Bearish, Sentiment::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "bullish",
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    /// Accepts the three labels case-insensitively, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bullish" => Ok(Sentiment::Bullish),
            "bearish" => Ok(Sentiment::Bearish),
            "neutral" => Ok(Sentiment::Neutral),
            other => Err(format!(
                "invalid sentiment '{}': expected bullish, bearish, or neutral",
                other
            )),
        }
    }
}

/// Candidate article produced by an [`ArticleSource`](crate::traits::ArticleSource)
/// before it reaches the store. Sentiment is always unset at this stage.
#[derive(Debug, Clone, PartialEq)]
pub struct NewArticle {
    pub title: String,
    pub content: Option<String>,
    pub source: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub tokens: Vec<String>,
    pub s3_bucket_source: Option<String>,
    pub s3_key_source: Option<String>,
}

impl NewArticle {
    /// A bare article with only title and source set.
    pub fn new(title: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: None,
            source: Some(source.into()),
            url: None,
            published_at: None,
            tokens: Vec::new(),
            s3_bucket_source: None,
            s3_key_source: None,
        }
    }
}

/// Article row as stored and served by the API.
#[derive(Debug, Clone, Serialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub source: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(rename = "tokens_mentioned")]
    pub tokens: Vec<String>,
    pub sentiment: Option<Sentiment>,
    pub confidence_score: Option<f64>,
    pub s3_bucket_source: Option<String>,
    pub s3_key_source: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Upper-case, trim, drop empties, and remove duplicates (first occurrence wins).
pub fn normalize_tokens<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for token in tokens {
        let token = token.as_ref().trim().to_uppercase();
        if !token.is_empty() && !out.contains(&token) {
            out.push(token);
        }
    }
    out
}

/// Set-union of two token lists, normalized; existing tokens keep their order.
pub fn merge_tokens(existing: &[String], extracted: &[String]) -> Vec<String> {
    normalize_tokens(existing.iter().chain(extracted.iter()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_parse_is_case_insensitive() {
        assert_eq!("Bullish".parse::<Sentiment>().unwrap(), Sentiment::Bullish);
        assert_eq!(" bearish ".parse::<Sentiment>().unwrap(), Sentiment::Bearish);
        assert!("positive".parse::<Sentiment>().is_err());
        assert!("".parse::<Sentiment>().is_err());
    }

    #[test]
    fn sentiment_serializes_lowercase() {
        let json = serde_json::to_string(&Sentiment::Neutral).unwrap();
        assert_eq!(json, "\"neutral\"");
    }

    #[test]
    fn normalize_uppercases_and_dedups() {
        let tokens = normalize_tokens(["btc", "ETH", " Btc ", "", "sol"]);
        assert_eq!(tokens, vec!["BTC", "ETH", "SOL"]);
    }

    #[test]
    fn merge_is_union_without_duplicates() {
        let existing = vec!["BTC".to_string(), "ETH".to_string()];
        let extracted = vec!["eth".to_string(), "SOL".to_string(), "btc".to_string()];
        assert_eq!(merge_tokens(&existing, &extracted), vec!["BTC", "ETH", "SOL"]);
    }

    #[test]
    fn merge_with_empty_extraction_keeps_existing() {
        let existing = vec!["DOGE".to_string()];
        assert_eq!(merge_tokens(&existing, &[]), vec!["DOGE"]);
    }
}
