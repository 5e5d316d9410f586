pub mod handlers;
pub mod models;
pub mod openapi;

use axum::{Router, extract::DefaultBodyLimit, routing::get};
use handlers::AppState;
use http::header;
use openapi::ApiDoc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Full HTTP application: JSON API, uploaded images, OpenAPI docs and health check.
pub fn app(service: AppState, max_upload_bytes: usize) -> Router {
    let uploads = ServeDir::new(service.uploads().dir());

    Router::new()
        .route("/", get(|| async { "OK" }))
        .nest("/api", handlers::api_routes(service))
        .nest_service("/uploads", uploads)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CompressionLayer::new()) // Gzip compression
        .layer(TimeoutLayer::new(Duration::from_secs(30))) // 30-second timeout
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([http::Method::GET, http::Method::POST])
                .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        )
        .layer(TraceLayer::new_for_http()) // Request tracing
}
