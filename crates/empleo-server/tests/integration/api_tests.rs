use axum::http::StatusCode;

use empleo_core::models::{Source, SourceSelection};
use empleo_core::testutil::MockSource;

use crate::integration::common::{default_sources, get_json, listings, setup_test_app};

#[tokio::test]
async fn health_returns_200() {
    let (ct, bm) = default_sources();
    let (status, json) = get_json(setup_test_app(ct, bm), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn search_returns_flat_array_in_source_order() {
    let (ct, bm) = default_sources();
    let (status, json) = get_json(setup_test_app(ct, bm), "/api/search?cargo=analista").await;

    assert_eq!(status, StatusCode::OK);
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["Título"], "Analista");
    assert_eq!(items[0]["Fuente"], "Computrabajo");
    assert_eq!(items[2]["Título"], "Vendedor");
    assert_eq!(items[2]["Fuente"], "Bumeran");
    assert_eq!(items[2]["Salario"], "No especificado");
    assert!(items[2]["SalarioMonto"].is_null());
    assert!(items[2]["Enlace"].as_str().unwrap().starts_with("https://"));
}

#[tokio::test]
async fn search_params_reach_the_sources() {
    let (ct, bm) = default_sources();
    let app = setup_test_app(ct.clone(), bm.clone());

    let (status, json) = get_json(
        app,
        "/api/search?cargo=analista&distrito=miraflores&sueldo_min=1500&sueldo_max=0&experiencia=2&jornada=tiempo-completo&fuente=computrabajo",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
    assert_eq!(bm.call_count(), 0);

    let calls = ct.calls.lock().unwrap();
    let (query, max_pages) = &calls[0];
    assert_eq!(query.title, "analista");
    assert_eq!(query.district, "miraflores");
    assert_eq!(query.salary_min, Some(1500));
    assert_eq!(query.salary_max, None);
    assert_eq!(query.experience_years, Some(2));
    assert_eq!(query.schedule.as_deref(), Some("tiempo-completo"));
    assert_eq!(query.sources, SourceSelection::Only(Source::Computrabajo));
    assert_eq!(*max_pages, 3);
}

#[tokio::test]
async fn english_aliases_are_accepted() {
    let (ct, bm) = default_sources();
    let app = setup_test_app(ct.clone(), bm);

    let (status, json) = get_json(app, "/api/search?title=dev&salary_min=&source=bumeran").await;

    assert_eq!(status, StatusCode::OK);
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["Fuente"], "Bumeran");
    assert_eq!(ct.call_count(), 0);
}

#[tokio::test]
async fn unknown_source_returns_400() {
    let (ct, bm) = default_sources();
    let (status, json) = get_json(setup_test_app(ct, bm), "/api/search?fuente=linkedin").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "invalid_query");
    assert!(json["message"].as_str().unwrap().contains("linkedin"));
}

#[tokio::test]
async fn non_numeric_salary_returns_400() {
    let (ct, bm) = default_sources();
    let (status, _) = get_json(setup_test_app(ct, bm), "/api/search?sueldo_min=mucho").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failing_source_still_returns_other_listings() {
    let app = setup_test_app(
        MockSource::failing(Source::Computrabajo, "Failed to launch browser"),
        MockSource::new(Source::Bumeran, listings(&["Uno", "Dos"])),
    );

    let (status, json) = get_json(app, "/api/search?cargo=x").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn report_includes_per_source_status() {
    let app = setup_test_app(
        MockSource::failing(Source::Computrabajo, "Failed to launch browser"),
        MockSource::new(Source::Bumeran, listings(&["Uno"])),
    );

    let (status, json) = get_json(app, "/api/search/report?cargo=x").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["listings"].as_array().unwrap().len(), 1);
    let sources = json["sources"].as_array().unwrap();
    assert_eq!(sources[0]["source"], "Computrabajo");
    assert_eq!(sources[0]["status"], "failed");
    assert!(sources[0]["error"].as_str().unwrap().contains("launch"));
    assert_eq!(sources[1]["status"], "ok");
    assert_eq!(sources[1]["count"], 1);
}

#[tokio::test]
async fn openapi_document_is_served() {
    let (ct, bm) = default_sources();
    let (status, json) = get_json(setup_test_app(ct, bm), "/api-docs/openapi.json").await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/search"].is_object());
}
