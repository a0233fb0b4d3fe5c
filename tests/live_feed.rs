//! Live feed tests against a local fake of the CoinGecko API.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cryptosent::config::LiveFeedConfig;
use cryptosent::live_feed::{LiveFeedFetcher, NEWS_SOURCE, TRENDING_SOURCE};
use cryptosent::traits::ArticleSource;

#[derive(Clone, Default)]
struct FakeApi {
    trending_fails: bool,
    /// `(path, api key header)` per request, in arrival order.
    requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl FakeApi {
    fn record(&self, path: String, headers: &HeaderMap) {
        let key = headers
            .get("x-cg-demo-api-key")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.requests.lock().unwrap().push((path, key));
    }
}

async fn trending(State(api): State<FakeApi>, headers: HeaderMap) -> Response {
    api.record("/search/trending".to_string(), &headers);
    if api.trending_fails {
        return (StatusCode::TOO_MANY_REQUESTS, "rate limited").into_response();
    }
    Json(json!({
        "coins": [
            {"item": {"id": "bitcoin", "name": "Bitcoin", "symbol": "btc", "market_cap_rank": 1}},
            {"item": {"id": "pepe", "name": "Pepe", "symbol": "pepe", "market_cap_rank": null}}
        ]
    }))
    .into_response()
}

async fn coin_news(
    State(api): State<FakeApi>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Response {
    api.record(format!("/coins/{}/news", id), &headers);
    if id != "bitcoin" {
        return (StatusCode::UNAUTHORIZED, "paid plan required").into_response();
    }
    Json(json!([
        {
            "title": "Bitcoin and Ethereum lead recovery",
            "content": "BTC and ETH rebound while SOL lags.",
            "url": "https://example.com/recovery",
            "published_at": "2025-09-05T08:30:00Z"
        },
        {"title": "   "}
    ]))
    .into_response()
}

async fn start_fake(api: FakeApi) -> String {
    let app = Router::new()
        .route("/search/trending", get(trending))
        .route("/coins/{id}/news", get(coin_news))
        .with_state(api);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn config(base_url: String, include_coin_news: bool, rate_limit_ms: u64) -> LiveFeedConfig {
    LiveFeedConfig {
        base_url,
        timeout_secs: 5,
        rate_limit_ms,
        include_coin_news,
    }
}

#[tokio::test]
async fn trending_coins_become_articles() {
    let api = FakeApi::default();
    let base = start_fake(api.clone()).await;
    let fetcher =
        LiveFeedFetcher::with_api_key(&config(base, false, 0), Some("demo-key".to_string()))
            .unwrap();

    let articles = fetcher.produce().await.unwrap();
    assert_eq!(articles.len(), 2);

    let btc = &articles[0];
    assert_eq!(btc.title, "Trending: Bitcoin (BTC)");
    assert_eq!(
        btc.content.as_deref(),
        Some("Coin Bitcoin is trending with rank #1")
    );
    assert_eq!(btc.source.as_deref(), Some(TRENDING_SOURCE));
    assert_eq!(btc.tokens, vec!["BTC"]);
    assert!(btc.published_at.is_some());
    assert!(btc.s3_key_source.is_none());

    assert_eq!(
        articles[1].content.as_deref(),
        Some("Coin Pepe is trending with rank #N/A")
    );

    let requests = api.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1.as_deref(), Some("demo-key"));
}

#[tokio::test]
async fn trending_failure_yields_no_articles() {
    let api = FakeApi {
        trending_fails: true,
        ..FakeApi::default()
    };
    let base = start_fake(api).await;
    let fetcher = LiveFeedFetcher::with_api_key(&config(base, true, 0), None).unwrap();

    let articles = fetcher.produce().await.unwrap();
    assert!(articles.is_empty());
}

#[tokio::test]
async fn unreachable_api_yields_no_articles() {
    let fetcher = LiveFeedFetcher::with_api_key(
        &config("http://127.0.0.1:9".to_string(), false, 0),
        None,
    )
    .unwrap();

    assert!(fetcher.produce().await.unwrap().is_empty());
}

#[tokio::test]
async fn coin_news_is_best_effort() {
    let api = FakeApi::default();
    let base = start_fake(api.clone()).await;
    let fetcher = LiveFeedFetcher::with_api_key(&config(base, true, 0), None).unwrap();

    let articles = fetcher.produce().await.unwrap();
    // Two trending placeholders plus the one titled bitcoin news item.
    assert_eq!(articles.len(), 3);

    let news = &articles[2];
    assert_eq!(news.title, "Bitcoin and Ethereum lead recovery");
    assert_eq!(news.source.as_deref(), Some(NEWS_SOURCE));
    assert_eq!(news.url.as_deref(), Some("https://example.com/recovery"));
    assert_eq!(news.tokens, vec!["BTC", "ETH", "SOL"]);

    let requests = api.requests.lock().unwrap();
    let paths: Vec<&str> = requests.iter().map(|(p, _)| p.as_str()).collect();
    assert_eq!(
        paths,
        vec!["/search/trending", "/coins/bitcoin/news", "/coins/pepe/news"]
    );
    assert!(requests.iter().all(|(_, key)| key.is_none()));
}

#[tokio::test]
async fn requests_are_rate_limited() {
    let api = FakeApi::default();
    let base = start_fake(api.clone()).await;
    let fetcher = LiveFeedFetcher::with_api_key(&config(base, true, 150), None).unwrap();

    let start = Instant::now();
    fetcher.produce().await.unwrap();

    assert_eq!(api.requests.lock().unwrap().len(), 3);
    assert!(start.elapsed() >= Duration::from_millis(300));
}
