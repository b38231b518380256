//! Session-scoped key/value store backing the aggregator's page cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::Expiry;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::StoreError;
use crate::models::asset::AssetRecord;
use crate::services::proxy::UpstreamSource;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: String, ttl: Duration);
    async fn keys(&self) -> Vec<String>;
}

#[derive(Debug, Clone)]
struct StoredValue {
    body: Arc<str>,
    ttl: Duration,
}

struct PerEntryTtl;

impl Expiry<String, StoredValue> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, value: &StoredValue, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &StoredValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

#[derive(Clone)]
pub struct MokaSessionStore {
    cache: Cache<String, StoredValue>,
}

impl MokaSessionStore {
    pub fn new(max_entries: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(PerEntryTtl)
            .build();

        Self { cache }
    }
}

impl Default for MokaSessionStore {
    fn default() -> Self {
        Self::new(1_000)
    }
}

#[async_trait]
impl SessionStore for MokaSessionStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.cache.get(key).await.map(|v| v.body.to_string())
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) {
        self.cache
            .insert(
                key.to_string(),
                StoredValue {
                    body: Arc::from(value),
                    ttl,
                },
            )
            .await;
    }

    async fn keys(&self) -> Vec<String> {
        self.cache.iter().map(|(k, _)| k.to_string()).collect()
    }
}

/// Serialized value of one cached dashboard page
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCacheEntry {
    pub data: Vec<AssetRecord>,
    /// Page size the page was requested with
    #[serde(default)]
    pub per_page: u32,
    /// Epoch milliseconds when the page was stored
    pub timestamp: i64,
}

impl ClientCacheEntry {
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let elapsed = now.timestamp_millis().saturating_sub(self.timestamp);
        Duration::from_millis(elapsed.max(0) as u64)
    }

    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) < ttl
    }
}

pub const PAGE_KEY_MARKER: &str = "_data_page_";

pub fn page_key(source: UpstreamSource, page: u32) -> String {
    format!("{}{}{}", source.as_str(), PAGE_KEY_MARKER, page)
}

/// Typed page cache over a `SessionStore`
#[derive(Clone)]
pub struct ClientPageCache {
    store: Arc<dyn SessionStore>,
    retention: Duration,
}

impl ClientPageCache {
    pub fn new(store: Arc<dyn SessionStore>, retention: Duration) -> Self {
        Self { store, retention }
    }

    pub async fn load(&self, key: &str) -> Result<Option<ClientCacheEntry>, StoreError> {
        match self.store.get(key).await {
            None => Ok(None),
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| StoreError::Decode {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    pub async fn save(&self, key: &str, data: &[AssetRecord], per_page: u32) -> Result<(), StoreError> {
        self.save_at(key, data, per_page, Utc::now()).await
    }

    pub async fn save_at(
        &self,
        key: &str,
        data: &[AssetRecord],
        per_page: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let entry = ClientCacheEntry {
            data: data.to_vec(),
            per_page,
            timestamp: at.timestamp_millis(),
        };
        let raw = serde_json::to_string(&entry).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;

        self.store.set(key, raw, self.retention).await;
        Ok(())
    }

    /// Every page key currently held, in no particular order
    pub async fn page_keys(&self) -> Vec<String> {
        self.store
            .keys()
            .await
            .into_iter()
            .filter(|k| k.contains(PAGE_KEY_MARKER))
            .collect()
    }
}
