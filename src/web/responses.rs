//! HTTP response types and utilities

use axum::{
    Json,
    body::Bytes,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::errors::AppError;
use crate::pixel::PIXEL_CONTENT_TYPE;

/// Error body returned by the JSON endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Convert AppError to appropriate HTTP response
pub fn handle_error(error: AppError) -> impl IntoResponse {
    tracing::error!("Request failed: {}", error);

    let message = match &error {
        AppError::Io(_) => "Storage operation failed".to_string(),
        AppError::Image(_) => "Image processing failed".to_string(),
        AppError::Configuration { message } => format!("Configuration error: {message}"),
    };

    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(message)))
}

/// The beacon image response; identical for every tracking outcome
pub fn pixel_response(bytes: Bytes) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(PIXEL_CONTENT_TYPE)),
            (
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-store, no-cache, must-revalidate, max-age=0"),
            ),
        ],
        bytes,
    )
        .into_response()
}
