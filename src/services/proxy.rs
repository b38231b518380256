//! Proxy route handler shielding one upstream pricing API.
//!
//! Each request walks the same path: fresh cache hit, then the rate-limit
//! window, then a retried upstream fetch, with stale cache (or an explicit
//! fallback payload) covering every failure.

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::UpstreamConfig;
use crate::error::FetchError;
use crate::models::proxy::{CoinCapProxyQuery, CoinGeckoProxyQuery};
use crate::models::response::FallbackPayload;
use crate::services::rate_limiter::WindowRateLimiter;
use crate::services::response_cache::ResponseCache;
use crate::services::retry::{fetch_with_retry, RetryPolicy};
use crate::services::upstream::UpstreamClient;

pub const PROXY_CACHE_HEADER: &str = "x-proxy-cache";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UpstreamSource {
    CoinGecko,
    CoinCap,
}

impl UpstreamSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamSource::CoinGecko => "coingecko",
            UpstreamSource::CoinCap => "coincap",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            UpstreamSource::CoinGecko => "CoinGecko",
            UpstreamSource::CoinCap => "CoinCap",
        }
    }
}

/// Request parameters that know their cache key and upstream URL
pub trait ProxyTarget: Debug {
    fn cache_key(&self) -> String;
    fn upstream_url(&self, base_url: &str) -> String;
}

impl ProxyTarget for CoinGeckoProxyQuery {
    fn cache_key(&self) -> String {
        format!(
            "coingecko_{}_{}_{}",
            normalize_currency(&self.vs_currency),
            self.page,
            self.per_page
        )
    }

    fn upstream_url(&self, base_url: &str) -> String {
        format!(
            "{}/coins/markets?vs_currency={}&order=market_cap_desc&per_page={}&page={}&sparkline=false&price_change_percentage=24h",
            base_url.trim_end_matches('/'),
            normalize_currency(&self.vs_currency),
            self.per_page,
            self.page
        )
    }
}

impl ProxyTarget for CoinCapProxyQuery {
    fn cache_key(&self) -> String {
        format!("{}_{}_{}", normalize_endpoint(&self.endpoint), self.limit, self.offset)
    }

    fn upstream_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}?limit={}&offset={}",
            base_url.trim_end_matches('/'),
            normalize_endpoint(&self.endpoint),
            self.limit,
            self.offset
        )
    }
}

fn normalize_currency(raw: &str) -> String {
    let currency: String = raw
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();

    if currency.is_empty() {
        "usd".to_string()
    } else {
        currency
    }
}

/// Only path-safe characters may reach the upstream URL
fn normalize_endpoint(raw: &str) -> String {
    let filtered: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '/')
        .collect();
    let endpoint = filtered.trim_matches('/');

    if endpoint.is_empty() {
        "assets".to_string()
    } else {
        endpoint.to_string()
    }
}

/// How a proxy request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyOutcome {
    /// Fresh cache entry, no network call
    Hit,
    /// Live upstream fetch
    Miss,
    /// Stale cache entry served after a rate limit or failure
    Stale,
    /// Rate limited with nothing cached
    Limited,
    /// Upstream failed with nothing cached
    Error,
}

impl ProxyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyOutcome::Hit => "hit",
            ProxyOutcome::Miss => "miss",
            ProxyOutcome::Stale => "stale",
            ProxyOutcome::Limited => "limited",
            ProxyOutcome::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub body: Value,
    pub outcome: ProxyOutcome,
}

impl ProxyResponse {
    fn data(body: Value, outcome: ProxyOutcome) -> Self {
        Self {
            status: StatusCode::OK,
            body,
            outcome,
        }
    }

    fn fallback(status: StatusCode, error: String, outcome: ProxyOutcome) -> Self {
        let body = serde_json::to_value(FallbackPayload::new(error))
            .unwrap_or_else(|_| serde_json::json!({ "isMockData": true }));

        Self {
            status,
            body,
            outcome,
        }
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        response.headers_mut().insert(
            PROXY_CACHE_HEADER,
            HeaderValue::from_static(self.outcome.as_str()),
        );
        response
    }
}

pub struct UpstreamProxy {
    source: UpstreamSource,
    base_url: String,
    cache: ResponseCache,
    limiter: WindowRateLimiter,
    client: Arc<dyn UpstreamClient>,
    retry: RetryPolicy,
}

impl UpstreamProxy {
    pub fn new(
        source: UpstreamSource,
        config: &UpstreamConfig,
        client: Arc<dyn UpstreamClient>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            source,
            base_url: config.base_url.clone(),
            cache: ResponseCache::new(config.cache_ttl),
            limiter: WindowRateLimiter::new(config.max_requests_per_window, config.window),
            client,
            retry,
        }
    }

    pub fn source(&self) -> UpstreamSource {
        self.source
    }

    pub fn remaining_requests(&self) -> u32 {
        self.limiter.remaining()
    }

    pub async fn handle<Q: ProxyTarget>(&self, query: &Q) -> ProxyResponse {
        let cache_key = query.cache_key();

        if let Some(data) = self.cache.get_fresh(&cache_key) {
            debug!(source = self.source.as_str(), key = %cache_key, "Serving from cache");
            return ProxyResponse::data(data, ProxyOutcome::Hit);
        }

        if !self.limiter.try_acquire() {
            warn!(
                source = self.source.as_str(),
                key = %cache_key,
                "Rate limit exceeded, serving from cache or returning error"
            );

            return match self.cache.get_any(&cache_key) {
                Some(stale) => ProxyResponse::data(stale, ProxyOutcome::Stale),
                None => ProxyResponse::fallback(
                    StatusCode::TOO_MANY_REQUESTS,
                    "Rate limit exceeded".to_string(),
                    ProxyOutcome::Limited,
                ),
            };
        }

        let url = query.upstream_url(&self.base_url);
        info!(source = self.source.as_str(), key = %cache_key, "Fetching {:?} from {}", query, self.source.display_name());

        match self.fetch(&url).await {
            Ok(data) => {
                self.cache.insert(cache_key, data.clone());
                ProxyResponse::data(data, ProxyOutcome::Miss)
            }
            Err(e) => {
                error!(source = self.source.as_str(), "Error fetching from {}: {}", self.source.display_name(), e);

                match self.cache.get_any(&cache_key) {
                    Some(stale) => {
                        info!(key = %cache_key, "Serving expired cache due to error");
                        ProxyResponse::data(stale, ProxyOutcome::Stale)
                    }
                    None => ProxyResponse::fallback(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Failed to fetch {}", self.source.display_name()),
                        ProxyOutcome::Error,
                    ),
                }
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        let response = fetch_with_retry(self.client.as_ref(), url, &self.retry).await?;

        if !response.status.is_success() {
            return Err(FetchError::Status {
                status: response.status.as_u16(),
            });
        }

        serde_json::from_str(&response.body).map_err(|e| FetchError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::ScriptedClient;
    use crate::services::upstream::UpstreamResponse;
    use serde_json::json;
    use std::time::Duration;

    fn upstream_config(max_requests: u32, cache_secs: u64) -> UpstreamConfig {
        UpstreamConfig {
            base_url: "http://upstream.test/api/v3".to_string(),
            cache_ttl: Duration::from_secs(cache_secs),
            max_requests_per_window: max_requests,
            window: Duration::from_secs(60),
        }
    }

    fn no_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 0,
            initial_delay: Duration::from_millis(10),
            max_delay: None,
        }
    }

    fn proxy(client: Arc<ScriptedClient>, max_requests: u32) -> UpstreamProxy {
        UpstreamProxy::new(
            UpstreamSource::CoinGecko,
            &upstream_config(max_requests, 120),
            client,
            no_retry(),
        )
    }

    fn ok(body: Value) -> Result<UpstreamResponse, FetchError> {
        Ok(UpstreamResponse::new(StatusCode::OK, body.to_string()))
    }

    fn page(n: u32) -> CoinGeckoProxyQuery {
        CoinGeckoProxyQuery {
            page: n,
            ..Default::default()
        }
    }

    #[test]
    fn test_cache_keys_and_urls() {
        let query = CoinGeckoProxyQuery {
            page: 2,
            per_page: 50,
            vs_currency: " EUR ".to_string(),
        };
        assert_eq!(query.cache_key(), "coingecko_eur_2_50");
        assert_eq!(
            query.upstream_url("https://api.coingecko.com/api/v3/"),
            "https://api.coingecko.com/api/v3/coins/markets?vs_currency=eur&order=market_cap_desc&per_page=50&page=2&sparkline=false&price_change_percentage=24h"
        );

        let query = CoinCapProxyQuery {
            endpoint: "../assets?x=1".to_string(),
            limit: 100,
            offset: 200,
        };
        assert_eq!(query.cache_key(), "assetsx1_100_200");

        let query = CoinCapProxyQuery::default();
        assert_eq!(query.cache_key(), "assets_100_0");
        assert_eq!(
            query.upstream_url("https://api.coincap.io/v2"),
            "https://api.coincap.io/v2/assets?limit=100&offset=0"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_skips_network() {
        let client = Arc::new(ScriptedClient::new(vec![ok(json!([{"id": "bitcoin"}]))]));
        let proxy = proxy(client.clone(), 10);

        let first = proxy.handle(&page(1)).await;
        assert_eq!(first.outcome, ProxyOutcome::Miss);
        assert_eq!(client.call_count(), 1);

        tokio::time::advance(Duration::from_secs(30)).await;

        let second = proxy.handle(&page(1)).await;
        assert_eq!(second.outcome, ProxyOutcome::Hit);
        assert_eq!(second.status, StatusCode::OK);
        assert_eq!(second.body, json!([{"id": "bitcoin"}]));
        // No new network call for the second request
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_ceiling_blocks_next_request() {
        let script = (0..5).map(|i| ok(json!([{ "page": i }]))).collect();
        let client = Arc::new(ScriptedClient::new(script));
        let proxy = proxy(client.clone(), 5);

        for n in 1..=5 {
            let response = proxy.handle(&page(n)).await;
            assert_eq!(response.outcome, ProxyOutcome::Miss);
        }

        let limited = proxy.handle(&page(6)).await;
        assert_eq!(limited.status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(limited.outcome, ProxyOutcome::Limited);
        assert_eq!(limited.body["isMockData"], json!(true));
        assert_eq!(limited.body["error"], json!("Rate limit exceeded"));
        assert_eq!(client.call_count(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_request_serves_stale_entry() {
        let client = Arc::new(ScriptedClient::new(vec![ok(json!(["old"]))]));
        let proxy = proxy(client.clone(), 1);

        proxy.handle(&page(1)).await;
        tokio::time::advance(Duration::from_secs(121)).await;
        // The window has reset, so this call reaches the upstream and fails
        client.push(Err(FetchError::Network("down".into())));
        let failed = proxy.handle(&page(1)).await;
        assert_eq!(failed.outcome, ProxyOutcome::Stale);

        let limited = proxy.handle(&page(1)).await;
        assert_eq!(limited.status, StatusCode::OK);
        assert_eq!(limited.outcome, ProxyOutcome::Stale);
        assert_eq!(limited.body, json!(["old"]));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_wins_over_error_payload() {
        let client = Arc::new(ScriptedClient::new(vec![ok(json!([{"id": "bitcoin"}]))]));
        let proxy = proxy(client.clone(), 10);

        proxy.handle(&page(1)).await;
        tokio::time::advance(Duration::from_secs(300)).await;

        client.push(Ok(UpstreamResponse::new(StatusCode::BAD_GATEWAY, "bad gateway")));
        let response = proxy.handle(&page(1)).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.outcome, ProxyOutcome::Stale);
        assert_eq!(response.body, json!([{"id": "bitcoin"}]));
    }

    #[tokio::test]
    async fn test_failure_without_cache_returns_marker() {
        let client = Arc::new(ScriptedClient::new(vec![Err(FetchError::Network(
            "connection refused".into(),
        ))]));
        let proxy = proxy(client, 10);

        let response = proxy.handle(&page(1)).await;

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.outcome, ProxyOutcome::Error);
        assert_eq!(
            response.body,
            json!({"error": "Failed to fetch CoinGecko", "isMockData": true})
        );
    }

    #[tokio::test]
    async fn test_undecodable_body_is_a_failure() {
        let client = Arc::new(ScriptedClient::new(vec![Ok(UpstreamResponse::new(
            StatusCode::OK,
            "<html>maintenance</html>",
        ))]));
        let proxy = proxy(client, 10);

        let response = proxy.handle(&page(1)).await;
        assert_eq!(response.outcome, ProxyOutcome::Error);
    }

    #[tokio::test]
    async fn test_into_response_sets_cache_header() {
        let response = ProxyResponse::data(json!([]), ProxyOutcome::Stale).into_response();
        assert_eq!(
            response.headers().get(PROXY_CACHE_HEADER).unwrap(),
            "stale"
        );
    }
}
