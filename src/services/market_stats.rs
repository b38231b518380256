use serde::Serialize;

use crate::models::asset::AssetRecord;

/// Aggregate figures over the rows currently shown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    pub total_market_cap: f64,
    pub total_volume: f64,
    /// Market-cap-weighted average of each asset's 24h change
    pub market_cap_change_percentage_24h: f64,
    pub active_assets: usize,
    pub total_market_cap_display: String,
    pub total_volume_display: String,
}

impl MarketStats {
    pub fn from_records(records: &[AssetRecord]) -> Self {
        let total_market_cap: f64 = records.iter().map(|r| r.market_cap).sum();
        let total_volume: f64 = records.iter().map(|r| r.total_volume).sum();

        let market_cap_change_percentage_24h = if total_market_cap > 0.0 {
            records
                .iter()
                .map(|r| r.market_cap_change_percentage_24h * r.market_cap)
                .sum::<f64>()
                / total_market_cap
        } else {
            0.0
        };

        Self {
            total_market_cap,
            total_volume,
            market_cap_change_percentage_24h,
            active_assets: records.len(),
            total_market_cap_display: format_compact_usd(total_market_cap),
            total_volume_display: format_compact_usd(total_volume),
        }
    }
}

pub fn format_compact_usd(value: f64) -> String {
    const SCALES: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];

    for (scale, suffix) in SCALES {
        if value >= scale {
            return format!("${:.2}{}", value / scale, suffix);
        }
    }
    format!("${:.2}", value)
}
