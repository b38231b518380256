//! Client-side aggregation of dashboard pages.
//!
//! A page is always produced. The sources are tried in a fixed order: fresh
//! client cache, CoinGecko, CoinCap, expired client cache, then mock data.

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::Utc;
use futures_util::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::asset::{map_coingecko_markets, AssetRecord, CoinCapAssetsResponse, CoinGeckoMarket};
use crate::models::dashboard::{Advisory, DashboardPage, DataSource};
use crate::models::proxy::{CoinCapProxyQuery, CoinGeckoProxyQuery};
use crate::services::mock_data::generate_mock_data;
use crate::services::proxy::{ProxyOutcome, ProxyResponse, UpstreamProxy, UpstreamSource};
use crate::services::session_store::{page_key, ClientCacheEntry, ClientPageCache};

pub const MAX_PER_PAGE: u32 = 250;

/// Zero-based offset of the first record on `page`, if every rank on the
/// page fits in a `u32`
fn page_offset(page: u32, per_page: u32) -> Option<u32> {
    let offset = (page as u64 - 1).checked_mul(per_page as u64)?;
    let last_rank = offset.checked_add(per_page as u64)?;
    u32::try_from(last_rank).ok()?;
    u32::try_from(offset).ok()
}

/// The two proxy routes as seen by the aggregator
#[async_trait]
pub trait MarketGateway: Send + Sync {
    async fn coingecko(&self, query: &CoinGeckoProxyQuery) -> ProxyResponse;
    async fn coincap(&self, query: &CoinCapProxyQuery) -> ProxyResponse;
}

/// Gateway that calls the in-process proxies directly
pub struct LocalGateway {
    coingecko: Arc<UpstreamProxy>,
    coincap: Arc<UpstreamProxy>,
}

impl LocalGateway {
    pub fn new(coingecko: Arc<UpstreamProxy>, coincap: Arc<UpstreamProxy>) -> Self {
        Self { coingecko, coincap }
    }
}

#[async_trait]
impl MarketGateway for LocalGateway {
    async fn coingecko(&self, query: &CoinGeckoProxyQuery) -> ProxyResponse {
        self.coingecko.handle(query).await
    }

    async fn coincap(&self, query: &CoinCapProxyQuery) -> ProxyResponse {
        self.coincap.handle(query).await
    }
}

/// What a proxy reply amounts to once the marker flag and body are checked
#[derive(Debug)]
enum Reply {
    Live(Vec<AssetRecord>),
    /// Data the proxy could only serve from its expired cache
    Stale(Vec<AssetRecord>),
    RateLimited,
    /// Body flagged `isMockData`; never used as data
    Degraded,
    Failed(StatusCode),
    Malformed(String),
}

impl Reply {
    fn reason(&self) -> String {
        match self {
            Reply::Live(_) => "live".to_string(),
            Reply::Stale(_) => "stale proxy cache".to_string(),
            Reply::RateLimited => "rate limited".to_string(),
            Reply::Degraded => "fallback payload".to_string(),
            Reply::Failed(status) => format!("status {}", status.as_u16()),
            Reply::Malformed(e) => format!("malformed payload: {}", e),
        }
    }
}

fn classify<F>(response: ProxyResponse, decode: F) -> Reply
where
    F: FnOnce(Value) -> Result<Vec<AssetRecord>, String>,
{
    if response.status == StatusCode::TOO_MANY_REQUESTS {
        return Reply::RateLimited;
    }
    if response.body.get("isMockData").and_then(Value::as_bool) == Some(true) {
        return Reply::Degraded;
    }
    if !response.status.is_success() {
        return Reply::Failed(response.status);
    }

    let stale = response.outcome == ProxyOutcome::Stale;
    match decode(response.body) {
        Ok(records) => match records.iter().try_for_each(AssetRecord::validate) {
            Ok(()) if stale => Reply::Stale(records),
            Ok(()) => Reply::Live(records),
            Err(e) => Reply::Malformed(e.to_string()),
        },
        Err(e) => Reply::Malformed(e),
    }
}

pub struct DashboardAggregator {
    gateway: Arc<dyn MarketGateway>,
    cache: ClientPageCache,
    fresh_ttl: Duration,
}

impl DashboardAggregator {
    pub fn new(gateway: Arc<dyn MarketGateway>, cache: ClientPageCache, fresh_ttl: Duration) -> Self {
        Self {
            gateway,
            cache,
            fresh_ttl,
        }
    }

    /// Load one page. Every failure is absorbed into stale or simulated data.
    pub async fn load_page(&self, page: u32, per_page: u32) -> DashboardPage {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let Some(offset) = page_offset(page, per_page) else {
            warn!(page, per_page, "Page is beyond any addressable rank");
            return mock_page(page, per_page);
        };
        let primary_key = page_key(UpstreamSource::CoinGecko, page);

        match self.cache.load(&primary_key).await {
            Ok(Some(entry)) if entry.per_page == per_page && entry.is_fresh(self.fresh_ttl, Utc::now()) => {
                debug!(key = %primary_key, "Serving page from client cache");
                return build_page(entry.data, page, per_page, DataSource::Cache, None);
            }
            Ok(_) => {}
            Err(e) => warn!(key = %primary_key, "Ignoring unreadable client cache entry: {}", e),
        }

        let primary = match self.fetch_coingecko(page, per_page, offset).await {
            Reply::Live(records) => {
                self.remember(&primary_key, &records, per_page).await;
                return build_page(records, page, per_page, DataSource::CoinGecko, None);
            }
            Reply::Stale(records) => {
                info!(page, "CoinGecko proxy served its expired cache");
                let advisory = Advisory::load_failed(DataSource::StaleCache);
                return build_page(records, page, per_page, DataSource::StaleCache, Some(advisory));
            }
            other => other,
        };
        warn!(page, reason = %primary.reason(), "CoinGecko unavailable, trying CoinCap");

        let rate_limited = matches!(primary, Reply::RateLimited);
        let advise = |shown: DataSource| {
            if rate_limited {
                Advisory::rate_limited(shown)
            } else {
                Advisory::load_failed(shown)
            }
        };

        match self.fetch_coincap(per_page, offset).await {
            Reply::Live(records) => {
                self.remember(&page_key(UpstreamSource::CoinCap, page), &records, per_page).await;
                return build_page(records, page, per_page, DataSource::CoinCap, Some(advise(DataSource::CoinCap)));
            }
            Reply::Stale(records) => {
                return build_page(records, page, per_page, DataSource::StaleCache, Some(advise(DataSource::StaleCache)));
            }
            other => warn!(page, reason = %other.reason(), "CoinCap unavailable, falling back to cached pages"),
        }

        if let Some(mut data) = self.expired_fallback(page).await {
            data.truncate(per_page as usize);
            return build_page(data, page, per_page, DataSource::StaleCache, Some(advise(DataSource::StaleCache)));
        }

        mock_page(page, per_page)
    }

    /// Load several pages concurrently. The result is ordered by page number,
    /// one entry per distinct page.
    pub async fn load_pages(&self, pages: &[u32], per_page: u32) -> Vec<DashboardPage> {
        let unique: BTreeSet<u32> = pages.iter().map(|p| (*p).max(1)).collect();

        let loaded = join_all(unique.iter().map(|&page| self.load_page(page, per_page))).await;

        let merged: BTreeMap<u32, DashboardPage> = loaded.into_iter().map(|p| (p.page, p)).collect();
        merged.into_values().collect()
    }

    async fn fetch_coingecko(&self, page: u32, per_page: u32, offset: u32) -> Reply {
        let query = CoinGeckoProxyQuery {
            page,
            per_page,
            ..Default::default()
        };
        let first_rank = offset + 1;

        let response = self.gateway.coingecko(&query).await;
        classify(response, |body| {
            let markets: Vec<CoinGeckoMarket> = serde_json::from_value(body).map_err(|e| e.to_string())?;
            Ok(map_coingecko_markets(markets, first_rank, Utc::now()))
        })
    }

    async fn fetch_coincap(&self, per_page: u32, offset: u32) -> Reply {
        let query = CoinCapProxyQuery {
            limit: per_page,
            offset,
            ..Default::default()
        };

        let response = self.gateway.coincap(&query).await;
        classify(response, |body| {
            let assets: CoinCapAssetsResponse = serde_json::from_value(body).map_err(|e| e.to_string())?;
            assets.into_records(Utc::now()).map_err(|e| e.to_string())
        })
    }

    async fn remember(&self, key: &str, records: &[AssetRecord], per_page: u32) {
        if let Err(e) = self.cache.save(key, records, per_page).await {
            warn!(key, "Failed to store page in client cache: {}", e);
        }
    }

    async fn load_any_age(&self, key: &str) -> Option<ClientCacheEntry> {
        match self.cache.load(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, "Skipping unreadable client cache entry: {}", e);
                None
            }
        }
    }

    /// Expired page with this page number from either source, else the most
    /// recently stored page of any number
    async fn expired_fallback(&self, page: u32) -> Option<Vec<AssetRecord>> {
        let preferred = [
            page_key(UpstreamSource::CoinGecko, page),
            page_key(UpstreamSource::CoinCap, page),
        ];

        for key in &preferred {
            if let Some(entry) = self.load_any_age(key).await {
                info!(key = %key, "Using expired client cache");
                return Some(entry.data);
            }
        }

        let mut newest: Option<(String, ClientCacheEntry)> = None;
        for key in self.cache.page_keys().await {
            if preferred.contains(&key) {
                continue;
            }
            if let Some(entry) = self.load_any_age(&key).await {
                if newest.as_ref().is_none_or(|(_, n)| entry.timestamp > n.timestamp) {
                    newest = Some((key, entry));
                }
            }
        }

        newest.map(|(key, entry)| {
            info!(key = %key, "Using most recent cached page from another page");
            entry.data
        })
    }
}

fn mock_page(page: u32, per_page: u32) -> DashboardPage {
    build_page(
        generate_mock_data(page, per_page),
        page,
        per_page,
        DataSource::Mock,
        Some(Advisory::simulated_data()),
    )
}

fn build_page(
    data: Vec<AssetRecord>,
    page: u32,
    per_page: u32,
    source: DataSource,
    advisory: Option<Advisory>,
) -> DashboardPage {
    DashboardPage {
        data,
        page,
        per_page,
        source,
        is_mock_data: source == DataSource::Mock,
        advisory,
    }
}

/// Hands out increasing tickets so only the newest in-flight load may commit
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}
