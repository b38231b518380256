use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Body returned by a proxy when it has no real data to give.
/// `isMockData` tells the client not to trust the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackPayload {
    pub error: String,
    #[serde(rename = "isMockData")]
    pub is_mock_data: bool,
}

impl FallbackPayload {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            is_mock_data: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_payload_wire_format() {
        let json = serde_json::to_value(FallbackPayload::new("Rate limit exceeded")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "Rate limit exceeded", "isMockData": true})
        );
    }
}
