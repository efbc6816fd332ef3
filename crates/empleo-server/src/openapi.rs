use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Empleo API",
        version = "0.1.0",
        description = "Job listings from Computrabajo and Bumeran in one normalized schema."
    ),
    paths(
        crate::routes::search,
        crate::routes::search_report,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::JobListingResponse,
        crate::dto::SourceOutcomeResponse,
        crate::dto::SearchReportResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "search", description = "Aggregated job search"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
