//! HTTP mapping of core errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use studiomap_core::StudiomapError;
use tracing::error;

/// Error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Optional error details
    pub details: Option<String>,
}

/// Handler error wrapping [`StudiomapError`]
#[derive(Debug)]
pub struct ApiError(pub StudiomapError);

impl From<StudiomapError> for ApiError {
    fn from(err: StudiomapError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            StudiomapError::Validation { .. } => StatusCode::BAD_REQUEST,
            StudiomapError::NotFound { .. } => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            error!(category = self.0.category(), "Request failed: {}", self.0);
            "Internal server error".to_string()
        };

        let body = Json(ErrorResponse {
            error: error_message,
            details: None,
        });

        (status, body).into_response()
    }
}

/// Result type of the HTTP handlers
pub type ApiResult<T> = std::result::Result<T, ApiError>;
