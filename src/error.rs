//! Error types for the signing engine and its HTTP surface

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::placement::AssetId;

/// Result type for core signing operations
pub type SignResult<T> = std::result::Result<T, SignError>;

/// Core error taxonomy
///
/// Validation errors from the coordinate transform and placement store are
/// always surfaced to the caller. Rendering and assembly errors abort the
/// operation in progress and leave prior state untouched.
#[derive(Debug, Error)]
pub enum SignError {
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    #[error("Page index {index} out of range (document has {page_count} pages)")]
    PageIndexOutOfRange { index: usize, page_count: usize },

    #[error("Failed to render page {}: {cause}", page_index + 1)]
    RenderFailed { page_index: usize, cause: String },

    #[error("Signature asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Unsupported image format: {0}")]
    UnsupportedImageFormat(String),

    #[error("Unsupported page rotation: {0} degrees")]
    UnsupportedRotation(i64),

    #[error("Nothing to commit: {0}")]
    NothingToCommit(String),

    #[error("Background removal service error{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    ServiceError { status: Option<u16>, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl SignError {
    pub fn render_failed(page_index: usize, cause: impl ToString) -> Self {
        Self::RenderFailed {
            page_index,
            cause: cause.to_string(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPdf(_) => "invalid_pdf",
            Self::PageIndexOutOfRange { .. } => "page_index_out_of_range",
            Self::RenderFailed { .. } => "render_failed",
            Self::AssetNotFound(_) => "asset_not_found",
            Self::InvalidGeometry(_) => "invalid_geometry",
            Self::UnsupportedImageFormat(_) => "unsupported_image_format",
            Self::UnsupportedRotation(_) => "unsupported_rotation",
            Self::NothingToCommit(_) => "nothing_to_commit",
            Self::ServiceError { .. } => "service_error",
            Self::Io(_) => "io_error",
            Self::Internal(_) => "internal_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::RenderFailed { .. } | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::ServiceError { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<lopdf::Error> for SignError {
    fn from(err: lopdf::Error) -> Self {
        SignError::InvalidPdf(err.to_string())
    }
}

/// HTTP-level error type
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upload too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::PayloadTooLarge { .. } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "payload_too_large",
                self.to_string(),
            ),
            AppError::Multipart(e) => {
                tracing::warn!("Multipart error: {}", e);
                (e.status(), "bad_request", "Failed to read upload".to_string())
            }
            AppError::Sign(e) => {
                let status = e.status_code();
                if status.is_server_error() {
                    tracing::error!("Signing error: {}", e);
                    (status, e.code(), "Signing failed on the server".to_string())
                } else {
                    (status, e.code(), e.to_string())
                }
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
            details: if cfg!(debug_assertions) {
                Some(self.to_string())
            } else {
                None
            },
        });

        (status, body).into_response()
    }
}
