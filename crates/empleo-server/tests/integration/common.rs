use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use empleo_core::aggregate::Aggregator;
use empleo_core::models::{JobListing, Source};
use empleo_core::testutil::{MockSource, make_test_listing};
use empleo_server::routes;
use empleo_server::state::AppState;

/// Router backed by the two given mock sources.
pub fn setup_test_app(computrabajo: MockSource, bumeran: MockSource) -> Router {
    let aggregator = Aggregator::new(computrabajo, bumeran);
    routes::router(Arc::new(AppState::new(aggregator)))
}

/// Two Computrabajo-side listings and one Bumeran-side listing.
pub fn default_sources() -> (MockSource, MockSource) {
    (
        MockSource::new(Source::Computrabajo, listings(&["Analista", "Contador"])),
        MockSource::new(Source::Bumeran, listings(&["Vendedor"])),
    )
}

pub fn listings(titles: &[&str]) -> Vec<JobListing> {
    titles.iter().map(|t| make_test_listing(t)).collect()
}

/// GET `uri` and return the status plus the body parsed as JSON
/// (`Value::Null` when the body is not JSON).
pub async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}
