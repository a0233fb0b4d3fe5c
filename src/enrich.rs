//! Sentiment enricher.
//!
//! Scores every article whose sentiment is unset. Each article is analyzed
//! on its own: a failed model call or an unusable reply falls back to the
//! neutral default and the run continues. Results are staged and written in
//! one transaction at the end, so a store failure leaves no article scored.

use anyhow::Result;
use std::sync::Arc;

use crate::models::{merge_tokens, Article};
use crate::reply::{parse_reply, SentimentReply};
use crate::store::{ArticleStore, SentimentUpdate};
use crate::traits::TextGenerator;

/// Characters of body text included in the prompt.
pub const PROMPT_CONTENT_CHARS: usize = 1000;

/// Build the analysis prompt for one article.
pub fn build_prompt(title: &str, content: &str) -> String {
    let excerpt: String = content.chars().take(PROMPT_CONTENT_CHARS).collect();
    format!(
        r#"You are a financial sentiment analysis expert specializing in cryptocurrency news.
Analyze the following crypto news article and determine its sentiment.

Title: {title}

Content: {excerpt}...

Please analyze the sentiment and provide your response in the following JSON format:
{{
    "sentiment": "bullish|bearish|neutral",
    "confidence_score": 0.0-1.0,
    "reasoning": "Brief explanation of your analysis",
    "tokens_mentioned": ["BTC", "ETH", "SOL", ...]
}}

Guidelines:
- "bullish": Positive sentiment, optimistic outlook, price increases expected
- "bearish": Negative sentiment, pessimistic outlook, price decreases expected
- "neutral": Balanced or factual reporting without clear directional bias
- confidence_score: 0.0 (low confidence) to 1.0 (high confidence)
- Extract all cryptocurrency tokens mentioned in the article
- Focus on the overall market sentiment, not just individual token mentions

Respond only with valid JSON, no additional text.
"#
    )
}

pub struct SentimentEnricher {
    store: Arc<ArticleStore>,
    generator: Arc<dyn TextGenerator>,
}

impl SentimentEnricher {
    pub fn new(store: Arc<ArticleStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    /// Analyze one article. Never fails.
    pub async fn analyze(&self, article: &Article) -> SentimentReply {
        let prompt = build_prompt(&article.title, article.content.as_deref().unwrap_or(""));
        match self.generator.generate(&prompt).await {
            Ok(raw) => parse_reply(&raw),
            Err(e) => {
                tracing::error!(
                    id = article.id,
                    model = %self.generator.model_name(),
                    error = %format!("{:#}", e),
                    "model call failed, using neutral fallback"
                );
                SentimentReply::fallback()
            }
        }
    }

    /// Score all unscored articles; returns how many were updated.
    pub async fn run(&self) -> Result<usize> {
        let pending = self.store.unscored().await?;
        if pending.is_empty() {
            tracing::info!("no articles awaiting sentiment analysis");
            return Ok(0);
        }

        let mut staged = Vec::with_capacity(pending.len());
        for article in &pending {
            let reply = self.analyze(article).await;
            tracing::info!(
                id = article.id,
                sentiment = %reply.sentiment,
                confidence = reply.confidence,
                reasoning = reply.reasoning.as_deref().unwrap_or(""),
                "analyzed article"
            );
            staged.push(SentimentUpdate {
                id: article.id,
                sentiment: reply.sentiment,
                confidence: reply.confidence,
                tokens: merge_tokens(&article.tokens, &reply.tokens),
            });
        }

        let updated = self.store.apply_sentiment(&staged).await?;
        tracing::info!(updated, "sentiment analysis finished");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_truncates_long_content() {
        let content = "é".repeat(1500);
        let prompt = build_prompt("Bitcoin hits new high", &content);
        assert!(prompt.contains("Title: Bitcoin hits new high"));
        let expected = format!("Content: {}...", "é".repeat(PROMPT_CONTENT_CHARS));
        assert!(prompt.contains(&expected));
        assert!(!prompt.contains(&"é".repeat(PROMPT_CONTENT_CHARS + 1)));
    }

    #[test]
    fn prompt_asks_for_all_reply_fields() {
        let prompt = build_prompt("t", "");
        for field in ["sentiment", "confidence_score", "reasoning", "tokens_mentioned"] {
            assert!(prompt.contains(field), "missing {}", field);
        }
    }
}
