use serde::{Deserialize, Serialize};

use crate::models::asset::AssetRecord;
use crate::services::market_stats::MarketStats;

/// Where the rows of a dashboard page came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    #[serde(rename = "coingecko")]
    CoinGecko,
    #[serde(rename = "coincap")]
    CoinCap,
    /// Fresh client cache entry
    #[serde(rename = "cache")]
    Cache,
    /// Expired client cache entry, used after both upstreams failed
    #[serde(rename = "stale_cache")]
    StaleCache,
    #[serde(rename = "mock")]
    Mock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvisoryKind {
    RateLimited,
    LoadFailed,
    SimulatedData,
}

/// Banner shown above a degraded page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub kind: AdvisoryKind,
    pub message: String,
}

impl Advisory {
    pub fn rate_limited(shown: DataSource) -> Self {
        Self {
            kind: AdvisoryKind::RateLimited,
            message: format!(
                "CoinGecko rate limit reached. Showing {} data.",
                describe(shown)
            ),
        }
    }

    pub fn load_failed(shown: DataSource) -> Self {
        Self {
            kind: AdvisoryKind::LoadFailed,
            message: format!(
                "Failed to load live data from CoinGecko. Showing {} data.",
                describe(shown)
            ),
        }
    }

    pub fn simulated_data() -> Self {
        Self {
            kind: AdvisoryKind::SimulatedData,
            message: "Market data is unavailable. Showing simulated data.".to_string(),
        }
    }
}

fn describe(source: DataSource) -> &'static str {
    match source {
        DataSource::CoinGecko => "CoinGecko",
        DataSource::CoinCap => "CoinCap",
        DataSource::Cache => "cached",
        DataSource::StaleCache => "previously cached",
        DataSource::Mock => "simulated",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardPage {
    pub data: Vec<AssetRecord>,
    pub page: u32,
    pub per_page: u32,
    pub source: DataSource,
    pub is_mock_data: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advisory: Option<Advisory>,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    pub search: Option<String>,
    pub sort: Option<String>,
}

impl Default for DashboardQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
            search: None,
            sort: None,
        }
    }
}

/// `?pages=1,2,3&per_page=100`
#[derive(Debug, Clone, Deserialize)]
pub struct DashboardPagesQuery {
    pub pages: String,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl DashboardPagesQuery {
    /// Parsed page list; `None` when any entry is not a number
    pub fn page_numbers(&self) -> Option<Vec<u32>> {
        self.pages
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| p.parse::<u32>().ok())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardPages {
    pub pages: Vec<DashboardPage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStatsResponse {
    #[serde(flatten)]
    pub stats: MarketStats,
    pub page: u32,
    pub source: DataSource,
    pub is_mock_data: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartSymbolResponse {
    pub id: String,
    pub symbol: String,
    pub exchanges: Vec<&'static str>,
}
