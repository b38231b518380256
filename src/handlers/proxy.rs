use axum::extract::{Query, State};

use crate::{
    models::proxy::{CoinCapProxyQuery, CoinGeckoProxyQuery},
    services::proxy::ProxyResponse,
    AppState,
};

/// Handler for GET /api/coingecko
pub async fn get_coingecko(
    State(state): State<AppState>,
    Query(query): Query<CoinGeckoProxyQuery>,
) -> ProxyResponse {
    state.coingecko.handle(&query).await
}

/// Handler for GET /api/coincap
pub async fn get_coincap(
    State(state): State<AppState>,
    Query(query): Query<CoinCapProxyQuery>,
) -> ProxyResponse {
    state.coincap.handle(&query).await
}
