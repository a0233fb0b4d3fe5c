//! HTTP provider tests: S3, Bedrock, and Ollama clients against local fakes.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use cryptosent::aws::AwsCredentials;
use cryptosent::config::{ArchiveConfig, Config, DbConfig, ModelConfig, ServerConfig};
use cryptosent::enrich::SentimentEnricher;
use cryptosent::llm::{BedrockGenerator, OllamaGenerator};
use cryptosent::models::{NewArticle, Sentiment};
use cryptosent::s3::S3ObjectStore;
use cryptosent::store::ArticleStore;
use cryptosent::traits::{ObjectStore, TextGenerator};
use cryptosent::{db, migrate};

const SENTIMENT_JSON: &str =
    r#"{"sentiment": "bullish", "confidence_score": 0.9, "reasoning": "inflows", "tokens_mentioned": ["btc"]}"#;

/// What the fakes saw: `(path, authorization header, body)` per request.
#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(String, Option<String>, Value)>>>);

impl Seen {
    fn record(&self, path: String, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.0.lock().unwrap().push((path, auth, body));
    }

    fn take(&self) -> Vec<(String, Option<String>, Value)> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }
}

async fn s3_object(
    State(seen): State<Seen>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    seen.record(format!("/{}/{}", bucket, key), &headers, Value::Null);
    if key == "reports/btc.txt" {
        "BTC closes the week higher.".into_response()
    } else {
        (StatusCode::NOT_FOUND, "NoSuchKey").into_response()
    }
}

async fn bedrock_invoke(
    State(seen): State<Seen>,
    Path(model): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    seen.record(format!("/model/{}/invoke", model), &headers, body);
    Json(json!({
        "content": [{"type": "text", "text": SENTIMENT_JSON}]
    }))
    .into_response()
}

async fn ollama_generate(State(seen): State<Seen>, headers: HeaderMap, body: Bytes) -> Response {
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    seen.record("/api/generate".to_string(), &headers, body);
    Json(json!({"model": "llama3", "response": SENTIMENT_JSON, "done": true})).into_response()
}

async fn ollama_down(State(seen): State<Seen>, headers: HeaderMap) -> Response {
    seen.record("/api/generate".to_string(), &headers, Value::Null);
    (StatusCode::INTERNAL_SERVER_ERROR, "model not loaded").into_response()
}

async fn start_fake(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn test_credentials() -> AwsCredentials {
    AwsCredentials {
        access_key_id: "AKIDEXAMPLE".to_string(),
        secret_access_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
        session_token: None,
    }
}

fn ollama_config(url: String) -> ModelConfig {
    ModelConfig {
        provider: "ollama".to_string(),
        model: "llama3".to_string(),
        url: Some(url),
        ..ModelConfig::default()
    }
}

#[tokio::test]
async fn s3_get_object_uses_path_style_endpoint() {
    let seen = Seen::default();
    let base = start_fake(
        Router::new()
            .route("/{bucket}/{*key}", get(s3_object))
            .with_state(seen.clone()),
    )
    .await;

    let store = S3ObjectStore::with_credentials(
        &ArchiveConfig {
            region: "us-east-1".to_string(),
            endpoint_url: Some(format!("{}/", base)),
            ..ArchiveConfig::default()
        },
        test_credentials(),
    );

    let bytes = store
        .get_object("news-archive", "reports/btc.txt")
        .await
        .unwrap();
    assert_eq!(bytes, b"BTC closes the week higher.");

    let requests = seen.take();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].0, "/news-archive/reports/btc.txt");
    let auth = requests[0].1.as_deref().unwrap();
    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"));
    assert!(auth.contains("/us-east-1/s3/aws4_request"));
}

#[tokio::test]
async fn s3_missing_object_is_an_error() {
    let seen = Seen::default();
    let base = start_fake(
        Router::new()
            .route("/{bucket}/{*key}", get(s3_object))
            .with_state(seen.clone()),
    )
    .await;

    let store = S3ObjectStore::with_credentials(
        &ArchiveConfig {
            endpoint_url: Some(base),
            ..ArchiveConfig::default()
        },
        test_credentials(),
    );

    let err = store
        .get_object("news-archive", "reports/missing.pdf")
        .await
        .unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("404"), "{}", message);
    assert!(message.contains("reports/missing.pdf"), "{}", message);
}

#[tokio::test]
async fn bedrock_invoke_returns_first_content_text() {
    let seen = Seen::default();
    let base = start_fake(
        Router::new()
            .route("/model/{model}/invoke", post(bedrock_invoke))
            .with_state(seen.clone()),
    )
    .await;

    let generator = BedrockGenerator::with_credentials(
        &ModelConfig {
            model: "claude-test".to_string(),
            region: "us-west-2".to_string(),
            max_tokens: 256,
            url: Some(base),
            ..ModelConfig::default()
        },
        test_credentials(),
    );

    assert_eq!(generator.generate("Analyze this").await.unwrap(), SENTIMENT_JSON);

    let requests = seen.take();
    assert_eq!(requests.len(), 1);
    let (path, auth, body) = &requests[0];
    assert_eq!(path, "/model/claude-test/invoke");
    assert!(auth
        .as_deref()
        .unwrap()
        .contains("/us-west-2/bedrock/aws4_request"));
    assert_eq!(body["max_tokens"], 256);
    assert_eq!(body["messages"][0]["content"], "Analyze this");
}

#[tokio::test]
async fn ollama_generate_returns_response_field() {
    let seen = Seen::default();
    let base = start_fake(
        Router::new()
            .route("/api/generate", post(ollama_generate))
            .with_state(seen.clone()),
    )
    .await;

    let generator = OllamaGenerator::new(&ollama_config(format!("{}/", base)));
    assert_eq!(generator.generate("Analyze this").await.unwrap(), SENTIMENT_JSON);

    let requests = seen.take();
    assert_eq!(requests.len(), 1);
    let body = &requests[0].2;
    assert_eq!(body["model"], "llama3");
    assert_eq!(body["prompt"], "Analyze this");
    assert_eq!(body["stream"], false);
}

#[tokio::test]
async fn ollama_error_status_is_an_error() {
    let base = start_fake(
        Router::new()
            .route("/api/generate", post(ollama_down))
            .with_state(Seen::default()),
    )
    .await;

    let generator = OllamaGenerator::new(&ollama_config(base));
    let err = generator.generate("Analyze this").await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("500"), "{}", message);
    assert!(message.contains("model not loaded"), "{}", message);
}

#[tokio::test]
async fn enrichment_falls_back_when_ollama_fails() {
    let seen = Seen::default();
    let base = start_fake(
        Router::new()
            .route("/api/generate", post(ollama_down))
            .with_state(seen.clone()),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let config = Config {
        db: DbConfig {
            path: tmp.path().join("providers.sqlite"),
        },
        server: ServerConfig {
            bind: "127.0.0.1:0".to_string(),
        },
        archive: Default::default(),
        live_feed: Default::default(),
        model: ollama_config(base.clone()),
    };
    let pool = db::connect(&config).await.unwrap();
    migrate::run_migrations(&pool).await.unwrap();
    let store = Arc::new(ArticleStore::new(pool));

    let mut article = NewArticle::new("Bitcoin miners capitulate", "CoinDesk");
    article.tokens = vec!["BTC".to_string()];
    store.insert_new(&[article]).await.unwrap();

    let enricher = SentimentEnricher::new(
        store.clone(),
        Arc::new(OllamaGenerator::new(&config.model)),
    );
    assert_eq!(enricher.run().await.unwrap(), 1);

    assert_eq!(seen.take().len(), 1);
    assert!(store.unscored().await.unwrap().is_empty());
    let scored = store.all_matching(&Default::default()).await.unwrap();
    assert_eq!(scored.len(), 1);
    assert_eq!(scored[0].sentiment, Some(Sentiment::Neutral));
    assert_eq!(scored[0].confidence_score, Some(0.5));
    assert_eq!(scored[0].tokens, vec!["BTC"]);
}
