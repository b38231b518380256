use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::FetchError;
use crate::services::upstream::{UpstreamClient, UpstreamResponse};

/// Upstream double that replays a fixed script and records each call
pub struct ScriptedClient {
    script: Mutex<VecDeque<Result<UpstreamResponse, FetchError>>>,
    calls: Mutex<Vec<(String, Instant)>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Result<UpstreamResponse, FetchError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, reply: Result<UpstreamResponse, FetchError>) {
        self.script.lock().push_back(reply);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(url, _)| url.clone()).collect()
    }

    /// Time elapsed between consecutive calls
    pub fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock();
        calls.windows(2).map(|w| w[1].1 - w[0].1).collect()
    }
}

#[async_trait]
impl UpstreamClient for ScriptedClient {
    async fn get(&self, url: &str) -> Result<UpstreamResponse, FetchError> {
        self.calls.lock().push((url.to_string(), Instant::now()));
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Network("script exhausted".into())))
    }
}
