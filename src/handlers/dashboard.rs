use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    models::{
        dashboard::{DashboardPage, DashboardPages, DashboardPagesQuery, DashboardQuery, DashboardStatsResponse},
        response::ErrorResponse,
    },
    services::{
        listing::{apply_view, SortKey},
        market_stats::MarketStats,
        refresher::DashboardSnapshot,
    },
    AppState,
};

/// Upper bound on pages fetched by one GET /api/dashboard/pages call
pub const MAX_PAGES_PER_REQUEST: usize = 10;

type HandlerError = (StatusCode, Json<ErrorResponse>);

fn bad_request(error: String) -> HandlerError {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error }))
}

/// Handler for GET /api/dashboard
/// One page through the full fallback chain, optionally searched and sorted
pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardPage>, HandlerError> {
    let sort = query
        .sort
        .as_deref()
        .unwrap_or_default()
        .parse::<SortKey>()
        .map_err(bad_request)?;

    let mut page = state.aggregator.load_page(query.page, query.per_page).await;

    tracing::info!(
        "Dashboard page {} served from {:?} ({} assets)",
        page.page,
        page.source,
        page.data.len()
    );

    page.data = apply_view(page.data, query.search.as_deref(), sort);
    Ok(Json(page))
}

/// Handler for GET /api/dashboard/pages
pub async fn get_dashboard_pages(
    State(state): State<AppState>,
    Query(query): Query<DashboardPagesQuery>,
) -> Result<Json<DashboardPages>, HandlerError> {
    let pages = query
        .page_numbers()
        .ok_or_else(|| bad_request(format!("Invalid page list: '{}'", query.pages)))?;

    if pages.is_empty() {
        return Err(bad_request("At least one page is required".to_string()));
    }
    if pages.len() > MAX_PAGES_PER_REQUEST {
        return Err(bad_request(format!(
            "At most {} pages per request",
            MAX_PAGES_PER_REQUEST
        )));
    }

    let pages = state.aggregator.load_pages(&pages, query.per_page).await;
    Ok(Json(DashboardPages { pages }))
}

/// Handler for GET /api/dashboard/latest
pub async fn get_latest_dashboard(
    State(state): State<AppState>,
) -> Result<Json<DashboardSnapshot>, HandlerError> {
    state.refresher.latest().map(Json).ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "No dashboard refresh has completed yet".to_string(),
            }),
        )
    })
}

/// Handler for GET /api/dashboard/stats
pub async fn get_dashboard_stats(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Json<DashboardStatsResponse> {
    let page = state.aggregator.load_page(query.page, query.per_page).await;

    Json(DashboardStatsResponse {
        stats: MarketStats::from_records(&page.data),
        page: page.page,
        source: page.source,
        is_mock_data: page.is_mock_data,
    })
}
