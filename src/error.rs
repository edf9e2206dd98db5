//! Error types for the filtered responses API

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;
use crate::params::ParamError;
use crate::upstream::UpstreamError;

/// Request handling error
#[derive(Debug, Error)]
pub enum ApiError {
    /// Rejected query parameters, reported back to the caller
    #[error(transparent)]
    Validation(#[from] ParamError),

    /// Upstream forms API could not be reached or answered badly
    #[error("upstream fetch failed: {0}")]
    Upstream(#[from] UpstreamError),
}

/// Result type for request handlers
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    /// HTTP status for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::Validation(err) => {
                tracing::debug!(error = %err, "rejected query parameters");
                err.to_string()
            }
            ApiError::Upstream(err) => {
                tracing::error!(error = ?err, "failed to fetch submissions from upstream");
                "Failed to fetch data".to_string()
            }
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
