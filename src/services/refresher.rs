//! Periodic dashboard refresh
//!
//! Reloads the configured pages on a fixed interval and keeps the newest
//! result as the `latest` snapshot.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::models::dashboard::DashboardPage;
use crate::services::aggregator::{DashboardAggregator, RequestSequencer};

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub pages: Vec<DashboardPage>,
    pub refreshed_at: DateTime<Utc>,
    #[serde(skip)]
    pub ticket: u64,
}

#[derive(Clone)]
pub struct DashboardRefresher {
    aggregator: Arc<DashboardAggregator>,
    sequencer: Arc<RequestSequencer>,
    latest: Arc<RwLock<Option<DashboardSnapshot>>>,
    pages: Vec<u32>,
    per_page: u32,
}

impl DashboardRefresher {
    pub fn new(aggregator: Arc<DashboardAggregator>, pages: Vec<u32>, per_page: u32) -> Self {
        Self {
            aggregator,
            sequencer: Arc::new(RequestSequencer::new()),
            latest: Arc::new(RwLock::new(None)),
            pages,
            per_page,
        }
    }

    pub fn latest(&self) -> Option<DashboardSnapshot> {
        self.latest.read().clone()
    }

    /// Run one refresh. Returns `false` when a newer refresh was started
    /// meanwhile and this result was discarded.
    pub async fn refresh(&self) -> bool {
        let ticket = self.sequencer.issue();
        let pages = self.aggregator.load_pages(&self.pages, self.per_page).await;
        self.commit(ticket, pages)
    }

    fn commit(&self, ticket: u64, pages: Vec<DashboardPage>) -> bool {
        let mut latest = self.latest.write();

        if !self.sequencer.is_current(ticket) {
            debug!(ticket, "Discarding superseded dashboard refresh");
            return false;
        }

        *latest = Some(DashboardSnapshot {
            pages,
            refreshed_at: Utc::now(),
            ticket,
        });
        true
    }

    /// Start the background refresh task
    pub fn start(&self, every: Duration) -> JoinHandle<()> {
        let refresher = self.clone();
        tokio::spawn(async move {
            info!("Starting dashboard refresh (every {} seconds)", every.as_secs());

            let mut interval = tokio::time::interval(every);
            loop {
                // The first tick completes immediately.
                interval.tick().await;
                if refresher.refresh().await {
                    debug!("Dashboard snapshot updated");
                }
            }
        })
    }
}
