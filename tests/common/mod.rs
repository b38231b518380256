use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Request, StatusCode},
    Router,
};
use crypto_dashboard::{
    build_router,
    config::AppConfig,
    error::FetchError,
    services::{
        retry::RetryPolicy,
        upstream::{UpstreamClient, UpstreamResponse},
    },
    AppState,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

pub const COINGECKO_BASE: &str = "http://coingecko.test/api/v3";
pub const COINCAP_BASE: &str = "http://coincap.test/v2";

/// Upstream double with a reply queue per base URL.
/// Unscripted calls fail with a network error.
#[derive(Default)]
pub struct RoutedUpstream {
    routes: Mutex<Vec<(String, VecDeque<Result<UpstreamResponse, FetchError>>)>>,
    calls: Mutex<Vec<String>>,
}

impl RoutedUpstream {
    pub fn reply(&self, base: &str, status: StatusCode, body: Value) {
        self.push(base, Ok(UpstreamResponse::new(status, body.to_string())));
    }

    pub fn push(&self, base: &str, reply: Result<UpstreamResponse, FetchError>) {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|(prefix, _)| prefix == base) {
            Some((_, queue)) => queue.push_back(reply),
            None => routes.push((base.to_string(), VecDeque::from([reply]))),
        }
    }

    pub fn calls_to(&self, base: &str) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter(|url| url.starts_with(base))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl UpstreamClient for RoutedUpstream {
    async fn get(&self, url: &str) -> Result<UpstreamResponse, FetchError> {
        self.calls.lock().push(url.to_string());

        let mut routes = self.routes.lock();
        routes
            .iter_mut()
            .find(|(prefix, _)| url.starts_with(prefix.as_str()))
            .and_then(|(_, queue)| queue.pop_front())
            .unwrap_or_else(|| Err(FetchError::Network(format!("no scripted reply for {}", url))))
    }
}

/// Defaults with test upstreams, no retries and no background refresh
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.coingecko.base_url = COINGECKO_BASE.to_string();
    config.coincap.base_url = COINCAP_BASE.to_string();
    config.retry = RetryPolicy {
        max_retries: 0,
        initial_delay: Duration::from_millis(1),
        max_delay: None,
    };
    config.refresh_interval = None;
    config
}

pub fn test_app(config: &AppConfig) -> (Router, AppState, Arc<RoutedUpstream>) {
    let upstream = Arc::new(RoutedUpstream::default());
    let state = AppState::new(config, upstream.clone());
    (build_router(state.clone()), state, upstream)
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, HeaderMap, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, body.to_vec())
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, HeaderMap, Value) {
    let (status, headers, body) = get(app, uri).await;
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, headers, json)
}

pub fn coingecko_markets(ids: &[&str]) -> Value {
    Value::Array(
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                json!({
                    "id": id,
                    "symbol": id,
                    "name": id,
                    "image": "https://example.test/icon.png",
                    "current_price": 100.0 / (i as f64 + 1.0),
                    "market_cap": 1_000_000.0 / (i as f64 + 1.0),
                    "market_cap_rank": i + 1,
                    "total_volume": 5_000.0,
                    "high_24h": 110.0,
                    "low_24h": 1.0,
                    "price_change_percentage_24h": 1.5,
                    "market_cap_change_percentage_24h": 1.2,
                    "circulating_supply": 1_000.0
                })
            })
            .collect(),
    )
}

pub fn coincap_assets(ids: &[&str]) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "id": id,
                "rank": (i + 1).to_string(),
                "symbol": id.to_uppercase(),
                "name": id,
                "supply": "1000.0",
                "maxSupply": null,
                "marketCapUsd": "50000.0",
                "volumeUsd24Hr": "2500.0",
                "priceUsd": "50.0",
                "changePercent24Hr": "4.0"
            })
        })
        .collect();

    json!({ "data": data, "timestamp": 1714564800000i64 })
}
