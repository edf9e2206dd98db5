//! Health check endpoint

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::ApiState;

/// Health check body
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests
    pub status: String,
    /// Crate version
    pub version: String,
    /// Host of the upstream forms API this instance proxies
    pub upstream: String,
    /// Current time, RFC 3339
    pub timestamp: String,
}

/// Health check
///
/// Reports liveness only; the upstream API is not contacted.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: state.version.clone(),
        upstream: state.upstream.host().unwrap_or_default().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}
