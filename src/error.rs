use thiserror::Error;

/// Errors raised while talking to an upstream pricing API.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Upstream kept rate limiting after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Upstream returned status {status}")]
    Status { status: u16 },

    #[error("Failed to decode upstream payload: {0}")]
    Decode(String),
}

impl FetchError {
    /// Network-level failures are worth another attempt; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Network(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout(e.to_string())
        } else if e.is_decode() {
            FetchError::Decode(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Raised when an upstream record cannot be turned into an `AssetRecord`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    #[error("Field '{field}' of asset '{id}' is not a number: '{value}'")]
    InvalidNumber {
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("Field '{field}' of asset '{id}' is missing")]
    MissingField { id: String, field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    #[error("Asset has an empty '{0}'")]
    EmptyField(&'static str),

    #[error("Asset '{id}' has an invalid '{field}': {value}")]
    InvalidValue {
        id: String,
        field: &'static str,
        value: f64,
    },

    #[error("Asset '{id}' reports low_24h {low} above high_24h {high}")]
    InvertedRange { id: String, low: f64, high: f64 },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("'{name}' has an invalid value '{value}'")]
    Invalid { name: String, value: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to encode cache entry '{key}': {source}")]
    Encode {
        key: String,
        source: serde_json::Error,
    },

    #[error("Failed to decode cache entry '{key}': {source}")]
    Decode {
        key: String,
        source: serde_json::Error,
    },
}
