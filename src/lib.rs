// src/lib.rs

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::AppConfig;
use services::{
    aggregator::{DashboardAggregator, LocalGateway},
    proxy::{UpstreamProxy, UpstreamSource},
    refresher::DashboardRefresher,
    session_store::{ClientPageCache, MokaSessionStore},
    upstream::UpstreamClient,
};

/// Pages kept warm by the background refresher
pub const REFRESH_PAGES: [u32; 1] = [1];
pub const REFRESH_PER_PAGE: u32 = 100;

#[derive(Clone)]
pub struct AppState {
    pub coingecko: Arc<UpstreamProxy>,
    pub coincap: Arc<UpstreamProxy>,
    pub aggregator: Arc<DashboardAggregator>,
    pub refresher: DashboardRefresher,
}

impl AppState {
    pub fn new(config: &AppConfig, client: Arc<dyn UpstreamClient>) -> Self {
        let coingecko = Arc::new(UpstreamProxy::new(
            UpstreamSource::CoinGecko,
            &config.coingecko,
            client.clone(),
            config.retry.clone(),
        ));
        let coincap = Arc::new(UpstreamProxy::new(
            UpstreamSource::CoinCap,
            &config.coincap,
            client,
            config.retry.clone(),
        ));

        let gateway = Arc::new(LocalGateway::new(coingecko.clone(), coincap.clone()));
        let page_cache = ClientPageCache::new(Arc::new(MokaSessionStore::default()), config.session_ttl);
        let aggregator = Arc::new(DashboardAggregator::new(gateway, page_cache, config.client_cache_ttl));
        let refresher = DashboardRefresher::new(aggregator.clone(), REFRESH_PAGES.to_vec(), REFRESH_PER_PAGE);

        Self {
            coingecko,
            coincap,
            aggregator,
            refresher,
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/api/coingecko", get(handlers::proxy::get_coingecko))
        .route("/api/coincap", get(handlers::proxy::get_coincap))
        .route("/api/dashboard", get(handlers::dashboard::get_dashboard))
        .route("/api/dashboard/pages", get(handlers::dashboard::get_dashboard_pages))
        .route("/api/dashboard/latest", get(handlers::dashboard::get_latest_dashboard))
        .route("/api/dashboard/stats", get(handlers::dashboard::get_dashboard_stats))
        .route("/api/chart-symbol/{id}", get(handlers::chart::get_chart_symbol))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> &'static str {
    "Crypto dashboard backend is running"
}

pub mod config;
pub mod error;

pub mod services {
    pub mod upstream;
    pub mod retry;
    pub mod rate_limiter;
    pub mod response_cache;
    pub mod proxy;
    pub mod session_store;
    pub mod mock_data;
    pub mod aggregator;
    pub mod refresher;
    pub mod market_stats;
    pub mod listing;
    pub mod chart_symbol;
    #[cfg(test)]
    pub mod test_support;
}

pub mod models {
    pub mod asset;
    pub mod dashboard;
    pub mod proxy;
    pub mod response;
}

pub mod handlers {
    pub mod chart;
    pub mod dashboard;
    pub mod proxy;
}
