use std::sync::Arc;

use axum::Router;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::dto::{HealthResponse, JobListingResponse, SearchParams, SearchReportResponse};
use crate::error::ApiError;
use crate::openapi::ApiDoc;
use crate::state::AppState;

/// Build the full router with all routes.
pub fn router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/search", get(search))
        .route("/api/search/report", get(search_report));

    let public = Router::new()
        .route("/health", get(health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    public.merge(api).with_state(state)
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/api/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Merged listings, Computrabajo first", body = [JobListingResponse]),
        (status = 400, description = "Invalid query parameters", body = crate::dto::ErrorResponse),
    ),
    tag = "search"
)]
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.into_query()?;
    let report = state.searcher.search(query).await;

    let listings: Vec<JobListingResponse> =
        report.listings.into_iter().map(Into::into).collect();
    Ok(axum::Json(listings))
}

#[utoipa::path(
    get,
    path = "/api/search/report",
    params(SearchParams),
    responses(
        (status = 200, description = "Merged listings with per-source status", body = SearchReportResponse),
        (status = 400, description = "Invalid query parameters", body = crate::dto::ErrorResponse),
    ),
    tag = "search"
)]
pub async fn search_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, ApiError> {
    let query = params.into_query()?;
    let report = state.searcher.search(query).await;
    Ok(axum::Json(SearchReportResponse::from(report)))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    ),
    tag = "system"
)]
pub async fn health() -> impl IntoResponse {
    axum::Json(HealthResponse { status: "healthy" })
}
