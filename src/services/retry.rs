//! Retry with exponential backoff, shared by every upstream integration.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::error::FetchError;
use crate::services::upstream::{UpstreamClient, UpstreamResponse};

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    /// Upper bound on the doubled backoff delay; `None` means uncapped
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    fn next_delay(&self, delay: Duration) -> Duration {
        let doubled = delay.saturating_mul(2);
        match self.max_delay {
            Some(cap) => doubled.min(cap),
            None => doubled,
        }
    }
}

/// Default "try again" predicate: the upstream answered 429
pub fn is_rate_limited(response: &UpstreamResponse) -> bool {
    response.status == StatusCode::TOO_MANY_REQUESTS
}

/// Run `send` until it yields a response the caller should interpret.
///
/// Responses matching `is_retryable` wait for `Retry-After` (or the current
/// delay) and go again. Network-level errors wait the current delay. The delay
/// doubles after every wait. Any other response is returned as-is.
pub async fn retry_with_backoff<F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    mut send: F,
    is_retryable: P,
) -> Result<UpstreamResponse, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<UpstreamResponse, FetchError>>,
    P: Fn(&UpstreamResponse) -> bool,
{
    let attempts = policy.attempts();
    let mut delay = policy.initial_delay;
    let mut last_error: Option<FetchError> = None;

    for attempt in 1..=attempts {
        debug!(attempt, max_attempts = attempts, upstream = %label, "Upstream fetch attempt");

        match send().await {
            Ok(response) if is_retryable(&response) => {
                if attempt == attempts {
                    error!(attempts, upstream = %label, "Still rate limited after final attempt");
                    return Err(FetchError::RateLimited { attempts });
                }

                let wait = response
                    .retry_after_secs()
                    .map(Duration::from_secs)
                    .unwrap_or(delay);

                warn!(
                    attempt,
                    status = response.status.as_u16(),
                    wait_ms = wait.as_millis() as u64,
                    upstream = %label,
                    "Rate limited by upstream, waiting before retry"
                );

                tokio::time::sleep(wait).await;
                delay = policy.next_delay(delay);
            }
            Ok(response) => return Ok(response),
            Err(e) if e.is_retryable() => {
                warn!(attempt, max_attempts = attempts, upstream = %label, "Attempt failed: {}", e);

                if attempt < attempts {
                    debug!(delay_ms = delay.as_millis() as u64, "Waiting before retry");
                    tokio::time::sleep(delay).await;
                    delay = policy.next_delay(delay);
                }

                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(FetchError::RateLimited { attempts }))
}

/// GET `url` through `client`, retrying 429s and network failures
pub async fn fetch_with_retry(
    client: &dyn UpstreamClient,
    url: &str,
    policy: &RetryPolicy,
) -> Result<UpstreamResponse, FetchError> {
    retry_with_backoff(policy, url, || client.get(url), is_rate_limited).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::ScriptedClient;

    fn ok(body: &str) -> Result<UpstreamResponse, FetchError> {
        Ok(UpstreamResponse::new(StatusCode::OK, body))
    }

    fn too_many() -> Result<UpstreamResponse, FetchError> {
        Ok(UpstreamResponse::new(StatusCode::TOO_MANY_REQUESTS, ""))
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_between_rate_limited_attempts() {
        let client = ScriptedClient::new(vec![too_many(), too_many(), too_many(), ok("[]")]);

        let response = fetch_with_retry(&client, "http://upstream/test", &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(
            client.gaps(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_header_takes_precedence() {
        let throttled = Ok(UpstreamResponse::new(StatusCode::TOO_MANY_REQUESTS, "").with_retry_after("2"));
        let client = ScriptedClient::new(vec![throttled, ok("[]")]);

        fetch_with_retry(&client, "http://upstream/test", &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(client.gaps(), vec![Duration::from_millis(2000)]);

        // Backoff has already reached 4000ms when the header arrives
        let throttled = Ok(UpstreamResponse::new(StatusCode::TOO_MANY_REQUESTS, "").with_retry_after("2"));
        let client = ScriptedClient::new(vec![too_many(), too_many(), throttled, ok("[]")]);
        fetch_with_retry(&client, "http://upstream/test", &RetryPolicy::default())
            .await
            .unwrap();
        assert_eq!(
            client.gaps(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(2000),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_rate_limit_status_returns_immediately() {
        let client = ScriptedClient::new(vec![Ok(UpstreamResponse::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom",
        ))]);

        let response = fetch_with_retry(&client, "http://upstream/test", &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_network_errors_exhaust_attempts() {
        let client = ScriptedClient::new(vec![
            Err(FetchError::Network("reset 1".into())),
            Err(FetchError::Network("reset 2".into())),
            Err(FetchError::Timeout("slow 3".into())),
            Err(FetchError::Network("reset 4".into())),
        ]);

        let err = fetch_with_retry(&client, "http://upstream/test", &RetryPolicy::default())
            .await
            .unwrap_err();

        assert_eq!(client.call_count(), 4);
        assert!(err.to_string().contains("reset 4"));
        assert_eq!(
            client.gaps(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_timeout() {
        let client = ScriptedClient::new(vec![Err(FetchError::Timeout("slow".into())), ok("[1]")]);

        let response = fetch_with_retry(&client, "http://upstream/test", &RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(response.body, "[1]");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_rate_limit_gives_up() {
        let client = ScriptedClient::new(vec![too_many(), too_many(), too_many(), too_many()]);

        let err = fetch_with_retry(&client, "http://upstream/test", &RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::RateLimited { attempts: 4 }));
        assert_eq!(client.call_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_delay_caps_backoff() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Some(Duration::from_millis(1500)),
        };
        let client = ScriptedClient::new(vec![too_many(), too_many(), too_many(), ok("[]")]);

        fetch_with_retry(&client, "http://upstream/test", &policy).await.unwrap();

        assert_eq!(
            client.gaps(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(1500),
                Duration::from_millis(1500),
            ]
        );
    }

    #[tokio::test]
    async fn test_decode_error_is_not_retried() {
        let client = ScriptedClient::new(vec![Err(FetchError::Decode("garbage".into())), ok("[]")]);

        let err = fetch_with_retry(&client, "http://upstream/test", &RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
        assert_eq!(client.call_count(), 1);
    }
}
