use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MappingError, SchemaError};

/// Canonical asset shape rendered by the dashboard, whatever the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: String,
    pub current_price: f64,
    pub high_24h: f64,
    pub low_24h: f64,
    pub market_cap: f64,
    pub market_cap_rank: u32,
    pub total_volume: f64,
    pub price_change_percentage_24h: f64,
    pub market_cap_change_percentage_24h: f64,
    pub circulating_supply: f64,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: f64,
    pub ath_date: DateTime<Utc>,
    pub atl: f64,
    pub atl_date: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl AssetRecord {
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.id.is_empty() {
            return Err(SchemaError::EmptyField("id"));
        }
        if self.symbol.is_empty() {
            return Err(SchemaError::EmptyField("symbol"));
        }
        if self.name.is_empty() {
            return Err(SchemaError::EmptyField("name"));
        }

        let prices = [
            ("current_price", self.current_price),
            ("high_24h", self.high_24h),
            ("low_24h", self.low_24h),
            ("market_cap", self.market_cap),
            ("total_volume", self.total_volume),
            ("circulating_supply", self.circulating_supply),
            ("ath", self.ath),
            ("atl", self.atl),
        ];
        for (field, value) in prices {
            if !value.is_finite() || value < 0.0 {
                return Err(SchemaError::InvalidValue {
                    id: self.id.clone(),
                    field,
                    value,
                });
            }
        }

        for (field, value) in [
            ("price_change_percentage_24h", self.price_change_percentage_24h),
            ("market_cap_change_percentage_24h", self.market_cap_change_percentage_24h),
        ] {
            if !value.is_finite() {
                return Err(SchemaError::InvalidValue {
                    id: self.id.clone(),
                    field,
                    value,
                });
            }
        }

        if self.low_24h > self.high_24h {
            return Err(SchemaError::InvertedRange {
                id: self.id.clone(),
                low: self.low_24h,
                high: self.high_24h,
            });
        }

        if self.market_cap_rank == 0 {
            return Err(SchemaError::InvalidValue {
                id: self.id.clone(),
                field: "market_cap_rank",
                value: 0.0,
            });
        }

        Ok(())
    }
}

// CoinGecko /coins/markets item
#[derive(Debug, Clone, Deserialize)]
pub struct CoinGeckoMarket {
    pub id: String,
    pub symbol: String,
    pub name: String,
    pub image: Option<String>,
    pub current_price: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub total_volume: Option<f64>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap_change_percentage_24h: Option<f64>,
    pub circulating_supply: Option<f64>,
    pub total_supply: Option<f64>,
    pub max_supply: Option<f64>,
    pub ath: Option<f64>,
    pub ath_date: Option<DateTime<Utc>>,
    pub atl: Option<f64>,
    pub atl_date: Option<DateTime<Utc>>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl CoinGeckoMarket {
    /// `fallback_rank` is used when CoinGecko has not ranked the coin
    pub fn into_record(self, fallback_rank: u32, fetched_at: DateTime<Utc>) -> AssetRecord {
        let current_price = self.current_price.unwrap_or(0.0);
        let last_updated = self.last_updated.unwrap_or(fetched_at);

        AssetRecord {
            id: self.id,
            symbol: self.symbol,
            name: self.name,
            image: self.image.unwrap_or_default(),
            current_price,
            high_24h: self.high_24h.unwrap_or(current_price),
            low_24h: self.low_24h.unwrap_or(current_price),
            market_cap: self.market_cap.unwrap_or(0.0),
            market_cap_rank: self.market_cap_rank.unwrap_or(fallback_rank),
            total_volume: self.total_volume.unwrap_or(0.0),
            price_change_percentage_24h: self.price_change_percentage_24h.unwrap_or(0.0),
            market_cap_change_percentage_24h: self.market_cap_change_percentage_24h.unwrap_or(0.0),
            circulating_supply: self.circulating_supply.unwrap_or(0.0),
            total_supply: self.total_supply,
            max_supply: self.max_supply,
            ath: self.ath.unwrap_or(current_price),
            ath_date: self.ath_date.unwrap_or(last_updated),
            atl: self.atl.unwrap_or(current_price),
            atl_date: self.atl_date.unwrap_or(last_updated),
            last_updated,
        }
    }
}

/// Map a CoinGecko page whose first coin sits at `first_rank`
pub fn map_coingecko_markets(
    markets: Vec<CoinGeckoMarket>,
    first_rank: u32,
    fetched_at: DateTime<Utc>,
) -> Vec<AssetRecord> {
    markets
        .into_iter()
        .enumerate()
        .map(|(i, market)| market.into_record(first_rank.saturating_add(i as u32), fetched_at))
        .collect()
}

// CoinCap v2 /assets response. Every number is a decimal string.
#[derive(Debug, Clone, Deserialize)]
pub struct CoinCapAssetsResponse {
    pub data: Vec<CoinCapAsset>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinCapAsset {
    pub id: String,
    pub rank: Option<String>,
    pub symbol: String,
    pub name: String,
    pub supply: Option<String>,
    pub max_supply: Option<String>,
    pub market_cap_usd: Option<String>,
    #[serde(rename = "volumeUsd24Hr")]
    pub volume_usd_24h: Option<String>,
    pub price_usd: Option<String>,
    #[serde(rename = "changePercent24Hr")]
    pub change_percent_24h: Option<String>,
}

/// CoinCap has no 24h range or all-time extremes, so those are approximated
/// from the current price and daily change.
const COINCAP_ATH_MULTIPLIER: f64 = 1.5;
const COINCAP_ATL_MULTIPLIER: f64 = 0.5;

impl CoinCapAsset {
    pub fn into_record(self, as_of: DateTime<Utc>) -> Result<AssetRecord, MappingError> {
        let price = parse_number(&self.id, "priceUsd", self.price_usd.as_deref())?.ok_or_else(|| {
            MappingError::MissingField {
                id: self.id.clone(),
                field: "priceUsd",
            }
        })?;
        let change = parse_number(&self.id, "changePercent24Hr", self.change_percent_24h.as_deref())?
            .unwrap_or(0.0);
        let supply = parse_number(&self.id, "supply", self.supply.as_deref())?;
        let max_supply = parse_number(&self.id, "maxSupply", self.max_supply.as_deref())?;
        let market_cap = parse_number(&self.id, "marketCapUsd", self.market_cap_usd.as_deref())?
            .unwrap_or(0.0);
        let volume = parse_number(&self.id, "volumeUsd24Hr", self.volume_usd_24h.as_deref())?
            .unwrap_or(0.0);

        let rank_raw = self.rank.clone().ok_or_else(|| MappingError::MissingField {
            id: self.id.clone(),
            field: "rank",
        })?;
        let rank = rank_raw
            .trim()
            .parse::<u32>()
            .map_err(|_| MappingError::InvalidNumber {
                id: self.id.clone(),
                field: "rank",
                value: rank_raw.clone(),
            })?;

        let swing = change.abs() / 100.0;

        Ok(AssetRecord {
            image: format!(
                "https://assets.coincap.io/assets/icons/{}@2x.png",
                self.symbol.to_lowercase()
            ),
            id: self.id,
            symbol: self.symbol.to_lowercase(),
            name: self.name,
            current_price: price,
            high_24h: price * (1.0 + swing),
            low_24h: (price * (1.0 - swing)).max(0.0),
            market_cap,
            market_cap_rank: rank,
            total_volume: volume,
            price_change_percentage_24h: change,
            market_cap_change_percentage_24h: change,
            circulating_supply: supply.unwrap_or(0.0),
            total_supply: supply,
            max_supply,
            ath: price * COINCAP_ATH_MULTIPLIER,
            ath_date: as_of,
            atl: price * COINCAP_ATL_MULTIPLIER,
            atl_date: as_of,
            last_updated: as_of,
        })
    }
}

impl CoinCapAssetsResponse {
    pub fn into_records(self, fetched_at: DateTime<Utc>) -> Result<Vec<AssetRecord>, MappingError> {
        let as_of = self
            .timestamp
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or(fetched_at);

        self.data
            .into_iter()
            .map(|asset| asset.into_record(as_of))
            .collect()
    }
}

fn parse_number(id: &str, field: &'static str, raw: Option<&str>) -> Result<Option<f64>, MappingError> {
    match raw {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| MappingError::InvalidNumber {
                id: id.to_string(),
                field,
                value: value.to_string(),
            }),
    }
}
