//! Filtered form responses API
//!
//! Proxies the submissions endpoint of an upstream forms API and adds
//! filtering on answer values, which the upstream cannot do itself.
//!
//! # Architecture
//!
//! ```text
//!   GET /{formId}/filteredResponses?filters=[...]
//!                  │
//!   ┌──────────────▼──────────────┐
//!   │  params: rule table         │── 400 {"error": ...}
//!   └──────────────┬──────────────┘
//!   ┌──────────────▼──────────────┐
//!   │  upstream: GET submissions  │── 500 {"error": "Failed to fetch data"}
//!   └──────────────┬──────────────┘
//!        no filters│ ──────────────► upstream page, verbatim
//!   ┌──────────────▼──────────────┐
//!   │  filter: AND of clauses     │
//!   └──────────────┬──────────────┘
//!   ┌──────────────▼──────────────┐
//!   │  paginate: slice + totals   │── 200 {responses, totalResponses, pageCount}
//!   └─────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod paginate;
pub mod params;
pub mod routes;
pub mod upstream;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use config::{ApiConfig, ConfigError};
pub use error::{ApiError, ApiResult};
pub use models::*;
pub use upstream::UpstreamClient;

/// API state
#[derive(Clone)]
pub struct ApiState {
    /// API version
    pub version: String,
    /// Upstream submissions client
    pub upstream: UpstreamClient,
}

impl ApiState {
    /// Build state from configuration
    pub fn new(config: &ApiConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            upstream: UpstreamClient::new(config)?,
        })
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Filtered Responses API",
        version = "1.0.0",
        description = "Form submissions with filtering on answer values",
        license(name = "Apache-2.0")
    ),
    paths(
        routes::health::health_check,
        routes::responses::filtered_responses,
    ),
    components(
        schemas(
            ErrorResponse, ResponsesPage,
            routes::health::HealthResponse
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "responses", description = "Filtered form submissions")
    )
)]
pub struct ApiDoc;

/// Build the API router
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(routes::health::health_check))
        .merge(routes::responses::router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(Arc::new(state))
}
