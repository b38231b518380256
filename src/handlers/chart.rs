use axum::{extract::Path, Json};

use crate::{
    models::dashboard::ChartSymbolResponse,
    services::chart_symbol::{available_exchanges, resolve_chart_symbol},
};

/// Handler for GET /api/chart-symbol/{id}
pub async fn get_chart_symbol(Path(id): Path<String>) -> Json<ChartSymbolResponse> {
    let symbol = resolve_chart_symbol(&id);
    let exchanges = available_exchanges(&symbol);

    tracing::debug!("Resolved chart symbol for {}: {}", id, symbol);

    Json(ChartSymbolResponse {
        id,
        symbol,
        exchanges,
    })
}
