use serde::Deserialize;

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    100
}

fn default_vs_currency() -> String {
    "usd".to_string()
}

fn default_endpoint() -> String {
    "assets".to_string()
}

/// Query parameters for GET /api/coingecko
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoProxyQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,
}

impl Default for CoinGeckoProxyQuery {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
            vs_currency: default_vs_currency(),
        }
    }
}

/// Query parameters for GET /api/coincap
#[derive(Debug, Clone, Deserialize)]
pub struct CoinCapProxyQuery {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_per_page")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

impl Default for CoinCapProxyQuery {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            limit: default_per_page(),
            offset: 0,
        }
    }
}
