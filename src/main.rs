use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crypto_dashboard::{build_router, config::AppConfig, services::upstream::HttpUpstreamClient, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,crypto_dashboard=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let client = HttpUpstreamClient::new(config.upstream_timeout).expect("Failed to build HTTP client");
    let state = AppState::new(&config, Arc::new(client));

    match config.refresh_interval {
        Some(every) => {
            state.refresher.start(every);
        }
        None => tracing::info!("Dashboard refresh disabled"),
    }

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .expect("Failed to bind listener");

    tracing::info!("Server listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
