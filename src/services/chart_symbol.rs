//! Maps dashboard asset ids to `EXCHANGE:PAIR` chart widget symbols.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

pub const DEFAULT_EXCHANGE: &str = "BINANCE";

lazy_static! {
    static ref TICKER_REGEX: Regex = Regex::new(r"^[A-Z0-9]{2,5}$").unwrap();

    // Ids whose usual pair is not simply `<TICKER>USDT`
    static ref DIRECT_PAIRS: HashMap<&'static str, &'static str> = HashMap::from([
        ("bitcoin", "BTCUSDT"),
        ("ethereum", "ETHUSDT"),
        ("ripple", "XRPUSDT"),
        ("xrp", "XRPUSDT"),
        ("litecoin", "LTCUSDT"),
        ("cardano", "ADAUSDT"),
        ("polkadot", "DOTUSDT"),
        ("dogecoin", "DOGEUSDT"),
        ("solana", "SOLUSDT"),
        ("tether", "USDTUSDC"),
        ("binancecoin", "BNBUSDT"),
        ("usd-coin", "USDCUSDT"),
        ("binance-usd", "BUSDUSDT"),
        ("avalanche-2", "AVAXUSDT"),
        ("matic-network", "MATICUSDT"),
        ("shiba-inu", "SHIBUSDT"),
    ]);

    static ref NAME_TO_TICKER: HashMap<&'static str, &'static str> = HashMap::from([
        ("bitcoin-cash", "BCH"),
        ("stellar", "XLM"),
        ("chainlink", "LINK"),
        ("monero", "XMR"),
        ("tron", "TRX"),
        ("eos", "EOS"),
        ("cosmos", "ATOM"),
        ("iota", "IOTA"),
        ("vechain", "VET"),
        ("theta", "THETA"),
        ("neo", "NEO"),
        ("aave", "AAVE"),
        ("maker", "MKR"),
        ("compound", "COMP"),
        ("uniswap", "UNI"),
        ("avalanche", "AVAX"),
        ("polygon", "MATIC"),
        ("algorand", "ALGO"),
        ("filecoin", "FIL"),
        ("tezos", "XTZ"),
        ("dash", "DASH"),
        ("zcash", "ZEC"),
        ("kusama", "KSM"),
        ("near", "NEAR"),
        ("fantom", "FTM"),
        ("hedera-hashgraph", "HBAR"),
        ("the-graph", "GRT"),
        ("pancakeswap", "CAKE"),
        ("chiliz", "CHZ"),
        ("decentraland", "MANA"),
        ("the-sandbox", "SAND"),
        ("axie-infinity", "AXS"),
        ("dai", "DAI"),
        ("wrapped-bitcoin", "WBTC"),
        ("crypto-com-chain", "CRO"),
        ("leo-token", "LEO"),
        ("quant", "QNT"),
        ("internet-computer", "ICP"),
        ("basic-attention-token", "BAT"),
        ("0x", "ZRX"),
        ("curve-dao-token", "CRV"),
        ("thorchain", "RUNE"),
        ("ethereum-classic", "ETC"),
        ("bitcoin-sv", "BSV"),
        ("terra-luna-classic", "LUNC"),
        ("apecoin", "APE"),
        ("optimism", "OP"),
        ("arbitrum", "ARB"),
        ("immutable-x", "IMX"),
        ("render-token", "RNDR"),
        ("fetch-ai", "FET"),
        ("injective-protocol", "INJ"),
        ("sui", "SUI"),
        ("aptos", "APT"),
        ("celestia", "TIA"),
        ("pepe", "PEPE"),
        ("bonk", "BONK"),
        ("worldcoin", "WLD"),
        ("jupiter", "JUP"),
        ("pyth-network", "PYTH"),
        ("lido-dao", "LDO"),
        ("staked-ether", "STETH"),
        ("ethena", "ENA"),
        ("first-digital-usd", "FDUSD"),
        ("pax-gold", "PAXG"),
    ]);
}

const QUOTE_CURRENCIES: [&str; 16] = [
    "USD", "USDT", "USDC", "BUSD", "DAI", "EUR", "GBP", "JPY", "AUD", "CAD", "CHF", "CNY", "KRW", "BTC", "ETH",
    "BNB",
];

const EXCHANGES: [&str; 10] = [
    "BINANCE", "COINBASE", "KRAKEN", "BITFINEX", "KUCOIN", "HUOBI", "BYBIT", "OKEX", "GEMINI", "BITSTAMP",
];

fn on_default_exchange(pair: &str) -> String {
    format!("{}:{}", DEFAULT_EXCHANGE, pair)
}

/// Chart symbol for a dashboard id, ticker, or `BASE/QUOTE` pair
pub fn resolve_chart_symbol(id: &str) -> String {
    let id = id.trim();

    if let Some((base, quote)) = id.split_once('/') {
        if !base.is_empty() && !quote.is_empty() {
            return on_default_exchange(&format!("{}{}", base.to_uppercase(), quote.to_uppercase()));
        }
    }

    if TICKER_REGEX.is_match(id) {
        return on_default_exchange(&format!("{}USDT", id));
    }

    let lower = id.to_lowercase();

    if let Some(pair) = DIRECT_PAIRS.get(lower.as_str()) {
        return on_default_exchange(pair);
    }

    if let Some(ticker) = NAME_TO_TICKER.get(lower.as_str()) {
        return on_default_exchange(&format!("{}USDT", ticker));
    }

    let ticker = match lower.split_once('-') {
        Some((first, _)) if !first.is_empty() => first.to_uppercase(),
        _ => lower.to_uppercase(),
    };
    on_default_exchange(&format!("{}USDT", ticker))
}

/// Preferred exchanges for a pair such as `BTCUSDT`; empty when the pair
/// does not end in a known quote currency
pub fn available_exchanges(pair: &str) -> Vec<&'static str> {
    let pair = pair.trim().to_uppercase();
    let pair = pair.rsplit(':').next().unwrap_or_default();

    let quoted = QUOTE_CURRENCIES
        .iter()
        .any(|quote| pair.len() > quote.len() && pair.ends_with(quote));

    if quoted {
        EXCHANGES.to_vec()
    } else {
        Vec::new()
    }
}
