//! Search and ordering of a loaded dashboard page.

use std::cmp::Ordering;
use std::str::FromStr;

use crate::models::asset::AssetRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    MarketCap,
    Price,
    Volume,
    Change,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "market_cap" => Ok(SortKey::MarketCap),
            "price" => Ok(SortKey::Price),
            "volume" => Ok(SortKey::Volume),
            "change" => Ok(SortKey::Change),
            other => Err(format!("Unknown sort key: {}", other)),
        }
    }
}

impl SortKey {
    fn value(&self, record: &AssetRecord) -> f64 {
        match self {
            SortKey::MarketCap => record.market_cap,
            SortKey::Price => record.current_price,
            SortKey::Volume => record.total_volume,
            SortKey::Change => record.price_change_percentage_24h,
        }
    }
}

/// Filter by case-insensitive name/symbol match, then sort descending
pub fn apply_view(records: Vec<AssetRecord>, search: Option<&str>, sort: SortKey) -> Vec<AssetRecord> {
    let needle = search.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty());

    let mut view: Vec<AssetRecord> = match needle {
        Some(needle) => records
            .into_iter()
            .filter(|r| r.name.to_lowercase().contains(&needle) || r.symbol.to_lowercase().contains(&needle))
            .collect(),
        None => records,
    };

    // Stable, so equal values keep their upstream order.
    view.sort_by(|a, b| {
        sort.value(b)
            .partial_cmp(&sort.value(a))
            .unwrap_or(Ordering::Equal)
    });
    view
}
