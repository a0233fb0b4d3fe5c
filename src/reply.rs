//! Model-reply parser.
//!
//! The model is asked for a JSON object with `sentiment`, `confidence_score`,
//! `reasoning` and `tokens_mentioned`. Replies are located as follows:
//!
//! 1. the whole trimmed reply, if it parses as a JSON object;
//! 2. otherwise the text from the first `{` to the last `}`.
//!
//! Anything that does not yield a valid label and a numeric confidence is
//! rejected with a [`ReplyError`]; [`parse_reply`] turns every rejection into
//! [`SentimentReply::fallback`] (`neutral`, `0.5`, no tokens).

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{normalize_tokens, Sentiment};

pub const FALLBACK_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Error, PartialEq)]
pub enum ReplyError {
    #[error("reply contains no JSON object")]
    NoJsonObject,
    #[error("invalid JSON in reply: {0}")]
    InvalidJson(String),
    #[error("invalid sentiment label: {0}")]
    InvalidLabel(String),
    #[error("missing or non-numeric confidence_score")]
    MissingConfidence,
}

/// Structured result of one analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentReply {
    pub sentiment: Sentiment,
    /// Always within `[0.0, 1.0]`.
    pub confidence: f64,
    pub reasoning: Option<String>,
    /// Upper-cased, deduplicated.
    pub tokens: Vec<String>,
}

impl SentimentReply {
    pub fn fallback() -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            confidence: FALLBACK_CONFIDENCE,
            reasoning: None,
            tokens: Vec::new(),
        }
    }
}

/// Parse a reply, falling back to the neutral default on any error.
pub fn parse_reply(raw: &str) -> SentimentReply {
    match try_parse_reply(raw) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(error = %e, "unusable model reply, using neutral fallback");
            SentimentReply::fallback()
        }
    }
}

pub fn try_parse_reply(raw: &str) -> Result<SentimentReply, ReplyError> {
    let object = locate_object(raw)?;

    let sentiment = match object.get("sentiment") {
        Some(Value::String(label)) => label
            .parse::<Sentiment>()
            .map_err(|_| ReplyError::InvalidLabel(label.clone()))?,
        Some(other) => return Err(ReplyError::InvalidLabel(other.to_string())),
        None => return Err(ReplyError::InvalidLabel("<missing>".to_string())),
    };

    let confidence = object
        .get("confidence_score")
        .and_then(Value::as_f64)
        .ok_or(ReplyError::MissingConfidence)?
        .clamp(0.0, 1.0);

    let reasoning = object
        .get("reasoning")
        .and_then(Value::as_str)
        .map(String::from);

    let tokens = match object.get("tokens_mentioned") {
        Some(Value::Array(items)) => normalize_tokens(items.iter().filter_map(Value::as_str)),
        _ => Vec::new(),
    };

    Ok(SentimentReply {
        sentiment,
        confidence,
        reasoning,
        tokens,
    })
}

fn locate_object(raw: &str) -> Result<Map<String, Value>, ReplyError> {
    let trimmed = raw.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(map);
    }

    let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) else {
        return Err(ReplyError::NoJsonObject);
    };
    if end < start {
        return Err(ReplyError::NoJsonObject);
    }

    match serde_json::from_str::<Value>(&trimmed[start..=end]) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ReplyError::NoJsonObject),
        Err(e) => Err(ReplyError::InvalidJson(e.to_string())),
    }
}
