use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::services::retry::RetryPolicy;

pub const DEFAULT_COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_COINCAP_BASE_URL: &str = "https://api.coincap.io/v2";

/// Limits and cache duration for one upstream proxy
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub cache_ttl: Duration,
    pub max_requests_per_window: u32,
    pub window: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub coingecko: UpstreamConfig,
    pub coincap: UpstreamConfig,
    pub retry: RetryPolicy,
    pub upstream_timeout: Duration,
    /// How long a client-side page stays fresh
    pub client_cache_ttl: Duration,
    /// How long client-side pages are retained for stale fallback
    pub session_ttl: Duration,
    /// Background refresh period, `None` when disabled
    pub refresh_interval: Option<Duration>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            coingecko: UpstreamConfig {
                base_url: DEFAULT_COINGECKO_BASE_URL.to_string(),
                cache_ttl: Duration::from_secs(120),
                max_requests_per_window: 10,
                window: Duration::from_secs(60),
            },
            coincap: UpstreamConfig {
                base_url: DEFAULT_COINCAP_BASE_URL.to_string(),
                cache_ttl: Duration::from_secs(60),
                max_requests_per_window: 5,
                window: Duration::from_secs(60),
            },
            retry: RetryPolicy::default(),
            upstream_timeout: Duration::from_secs(10),
            client_cache_ttl: Duration::from_secs(60),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            refresh_interval: Some(Duration::from_secs(60)),
        }
    }
}

impl AppConfig {
    /// Build the config from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let window = Duration::from_secs(env_or("RATE_LIMIT_WINDOW_SECS", 60)?);
        let refresh_secs: u64 = env_or("REFRESH_INTERVAL_SECS", 60)?;

        Ok(Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port)?,
            coingecko: UpstreamConfig {
                base_url: env::var("COINGECKO_BASE_URL").unwrap_or(defaults.coingecko.base_url),
                cache_ttl: Duration::from_secs(env_or("COINGECKO_CACHE_SECS", 120)?),
                max_requests_per_window: env_or("COINGECKO_MAX_REQUESTS", 10)?,
                window,
            },
            coincap: UpstreamConfig {
                base_url: env::var("COINCAP_BASE_URL").unwrap_or(defaults.coincap.base_url),
                cache_ttl: Duration::from_secs(env_or("COINCAP_CACHE_SECS", 60)?),
                max_requests_per_window: env_or("COINCAP_MAX_REQUESTS", 5)?,
                window,
            },
            retry: RetryPolicy {
                max_retries: env_or("RETRY_MAX_RETRIES", 3)?,
                initial_delay: Duration::from_millis(env_or("RETRY_INITIAL_DELAY_MS", 1000)?),
                max_delay: None,
            },
            upstream_timeout: Duration::from_secs(env_or("UPSTREAM_TIMEOUT_SECS", 10)?),
            client_cache_ttl: Duration::from_secs(env_or("CLIENT_CACHE_SECS", 60)?),
            session_ttl: Duration::from_secs(env_or("SESSION_TTL_SECS", 86_400)?),
            refresh_interval: (refresh_secs > 0).then(|| Duration::from_secs(refresh_secs)),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => {
            raw.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
                name: name.to_string(),
                value: raw,
            })
        }
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_upstream_budgets() {
        let config = AppConfig::default();
        assert_eq!(config.coingecko.max_requests_per_window, 10);
        assert_eq!(config.coingecko.cache_ttl, Duration::from_secs(120));
        assert_eq!(config.coincap.max_requests_per_window, 5);
        assert_eq!(config.coincap.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(1000));
        assert_eq!(config.bind_address(), "0.0.0.0:3000");
    }

    #[test]
    fn test_env_or_falls_back_when_unset() {
        let value: u32 = env_or("CRYPTO_DASHBOARD_TEST_UNSET_VARIABLE", 42).unwrap();
        assert_eq!(value, 42);
    }
}
