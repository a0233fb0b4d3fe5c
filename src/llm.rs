//! Text-generation providers.
//!
//! - **[`BedrockGenerator`]**: Anthropic models on Amazon Bedrock via
//!   `POST /model/{id}/invoke`, signed with SigV4 (service `bedrock`). `[model].url`
//!   overrides the regional endpoint.
//! - **[`OllamaGenerator`]**: a local Ollama instance via `POST /api/generate`.
//!
//! Use [`create_generator`] to build the provider named in `[model]`.
//! Neither provider retries or enforces a timeout: a slow model call blocks
//! the enrichment run until it returns.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use crate::aws::{self, AwsCredentials, SignableRequest};
use crate::config::ModelConfig;
use crate::traits::TextGenerator;

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Build the configured provider.
pub fn create_generator(config: &ModelConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "bedrock" => Ok(Arc::new(BedrockGenerator::new(config))),
        "ollama" => Ok(Arc::new(OllamaGenerator::new(config))),
        other => bail!("Unknown model provider: {}", other),
    }
}

// ============ Bedrock ============

pub struct BedrockGenerator {
    model: String,
    region: String,
    max_tokens: u32,
    /// Overrides `https://bedrock-runtime.{region}.amazonaws.com`.
    endpoint: Option<String>,
    credentials: Option<AwsCredentials>,
    client: reqwest::Client,
}

impl BedrockGenerator {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            model: config.model.clone(),
            region: config.region.clone(),
            max_tokens: config.max_tokens,
            endpoint: config
                .url
                .as_deref()
                .map(|u| u.trim_end_matches('/').to_string()),
            credentials: None,
            client: reqwest::Client::new(),
        }
    }

    /// Sign every request with `credentials` instead of the environment's.
    pub fn with_credentials(config: &ModelConfig, credentials: AwsCredentials) -> Self {
        Self {
            credentials: Some(credentials),
            ..Self::new(config)
        }
    }

    fn base_url(&self) -> String {
        match self.endpoint {
            Some(ref endpoint) => endpoint.clone(),
            None => format!("https://bedrock-runtime.{}.amazonaws.com", self.region),
        }
    }
}

/// Request body for an Anthropic model on Bedrock.
pub fn bedrock_request_body(prompt: &str, max_tokens: u32) -> serde_json::Value {
    serde_json::json!({
        "anthropic_version": BEDROCK_ANTHROPIC_VERSION,
        "max_tokens": max_tokens,
        "messages": [
            { "role": "user", "content": prompt }
        ]
    })
}

/// Pull the reply text out of a Bedrock Anthropic response (`content[0].text`).
pub fn parse_bedrock_response(json: &serde_json::Value) -> Result<String> {
    json.get("content")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("text"))
        .and_then(|t| t.as_str())
        .map(String::from)
        .ok_or_else(|| anyhow::anyhow!("Invalid Bedrock response: missing content[0].text"))
}

#[async_trait]
impl TextGenerator for BedrockGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let creds = AwsCredentials::resolve(self.credentials.as_ref())?;
        let base_url = self.base_url();
        let host = aws::endpoint_host(&base_url);
        let path = format!("/model/{}/invoke", aws::uri_encode(&self.model));
        let body = serde_json::to_vec(&bedrock_request_body(prompt, self.max_tokens))?;

        let headers = aws::sign(
            &creds,
            &SignableRequest {
                method: "POST",
                host,
                path: &path,
                query: "",
                payload: &body,
                region: &self.region,
                service: "bedrock",
            },
            Utc::now(),
        );

        let mut req = self
            .client
            .post(format!("{}{}", base_url, path))
            .header("Content-Type", "application/json")
            .header("Accept", "application/json");
        for (name, value) in &headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let resp = req.body(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            bail!("Bedrock API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = resp.json().await?;
        parse_bedrock_response(&json)
    }
}

// ============ Ollama ============

pub struct OllamaGenerator {
    model: String,
    url: String,
    client: reqwest::Client,
}

impl OllamaGenerator {
    pub fn new(config: &ModelConfig) -> Self {
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
        Self {
            model: config.model.clone(),
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let resp = self
            .client
            .post(format!("{}/api/generate", self.url))
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = resp.json().await?;
        json.get("response")
            .and_then(|r| r.as_str())
            .map(String::from)
            .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing response field"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bedrock_body_uses_messages_api() {
        let body = bedrock_request_body("hello", 1000);
        assert_eq!(body["anthropic_version"], BEDROCK_ANTHROPIC_VERSION);
        assert_eq!(body["max_tokens"], 1000);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn bedrock_response_text_is_extracted() {
        let json = serde_json::json!({
            "content": [{ "type": "text", "text": "{\"sentiment\": \"bullish\"}" }]
        });
        assert_eq!(
            parse_bedrock_response(&json).unwrap(),
            "{\"sentiment\": \"bullish\"}"
        );
        assert!(parse_bedrock_response(&serde_json::json!({"content": []})).is_err());
    }

    #[test]
    fn create_generator_picks_provider() {
        let mut config = ModelConfig::default();
        assert_eq!(
            create_generator(&config).unwrap().model_name(),
            "anthropic.claude-3-haiku-20240307-v1:0"
        );
        config.provider = "ollama".to_string();
        config.model = "llama3".to_string();
        assert_eq!(create_generator(&config).unwrap().model_name(), "llama3");
        config.provider = "other".to_string();
        assert!(create_generator(&config).is_err());
    }
}
