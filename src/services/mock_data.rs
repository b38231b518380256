//! Deterministic-identity placeholder market data, served when every real source
//! and every cached page has failed.

use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;

use crate::models::asset::AssetRecord;

pub const MOCK_POOL_SIZE: u32 = 500;
pub const MOCK_IMAGE: &str = "/placeholder.svg?height=32&width=32";

const KNOWN_COINS: [(&str, &str, &str); 10] = [
    ("bitcoin", "btc", "Bitcoin"),
    ("ethereum", "eth", "Ethereum"),
    ("tether", "usdt", "Tether"),
    ("binancecoin", "bnb", "Binance Coin"),
    ("ripple", "xrp", "XRP"),
    ("cardano", "ada", "Cardano"),
    ("solana", "sol", "Solana"),
    ("polkadot", "dot", "Polkadot"),
    ("dogecoin", "doge", "Dogecoin"),
    ("avalanche-2", "avax", "Avalanche"),
];

const MAX_SUPPLY_RANK_LIMIT: u32 = 250;

fn identity(rank: u32) -> (String, String, String) {
    match KNOWN_COINS.get(rank as usize - 1) {
        Some((id, symbol, name)) => (id.to_string(), symbol.to_string(), name.to_string()),
        None => (
            format!("mock-coin-{}", rank),
            format!("mc{}", rank),
            format!("Mock Coin {}", rank),
        ),
    }
}

fn base_price(rank: u32) -> f64 {
    match rank {
        1 => 50_000.0,
        2 => 3_000.0,
        r => 1_000.0 / r as f64,
    }
}

/// Page `page` (1-based; 0 is treated as 1) of the mock pool
pub fn generate_mock_data(page: u32, per_page: u32) -> Vec<AssetRecord> {
    let page = page.max(1);
    let start = (page as u64 - 1) * per_page as u64;
    if start >= MOCK_POOL_SIZE as u64 {
        return Vec::new();
    }
    let end = (start + per_page as u64).min(MOCK_POOL_SIZE as u64);

    tracing::warn!(page, per_page, "Generating mock data as last resort");

    let now = Utc::now();
    let year_ago = now - ChronoDuration::days(365);
    let mut rng = rand::thread_rng();

    ((start as u32 + 1)..=(end as u32))
        .map(|rank| {
            let (id, symbol, name) = identity(rank);
            let base = base_price(rank);
            let change: f64 = rng.gen_range(-10.0..=10.0);
            let swing = change.abs() / 100.0;

            AssetRecord {
                id,
                symbol,
                name,
                image: MOCK_IMAGE.to_string(),
                current_price: base,
                high_24h: base * (1.0 + swing),
                low_24h: base * (1.0 - swing),
                market_cap: base * 1e6 * (MOCK_POOL_SIZE - rank) as f64,
                market_cap_rank: rank,
                total_volume: base * 5e5 * (250 - rank.min(249)) as f64,
                price_change_percentage_24h: change,
                market_cap_change_percentage_24h: change,
                circulating_supply: 1e6 * (MOCK_POOL_SIZE - rank) as f64,
                total_supply: Some(1e6 * (550 - rank) as f64),
                max_supply: (rank < MAX_SUPPLY_RANK_LIMIT).then(|| 1e6 * (600 - rank) as f64),
                ath: base * 1.5,
                ath_date: now,
                atl: base * 0.5,
                atl_date: year_ago,
                last_updated: now,
            }
        })
        .collect()
}
