use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::documents::DocumentError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `CONTENT_MISSING`, `CONTENT_CORRUPTED`, `INTERNAL_ERROR`.
    #[schema(example = "VALIDATION_ERROR")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Only application/pdf files are allowed (got 'image/png')")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    /// The document is indexed but its content is gone.
    ContentMissing(String),
    Corrupted(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::ContentMissing(msg) => (
                StatusCode::GONE,
                ErrorBody {
                    code: "CONTENT_MISSING",
                    message: msg,
                },
            ),
            AppError::Corrupted(detail) => {
                tracing::error!("Corrupted content: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "CONTENT_CORRUPTED",
                        message: "Stored document content is corrupted".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        match err {
            DocumentError::Validation(e) => AppError::Validation(e.to_string()),
            DocumentError::NotFound(_) => AppError::NotFound("Document not found".into()),
            DocumentError::ContentMissing { .. } => {
                AppError::ContentMissing("Document content is no longer available".into())
            }
            DocumentError::Corrupted { .. } => AppError::Corrupted(err.to_string()),
            DocumentError::Blob(_) | DocumentError::Index(_) => AppError::Internal(err.to_string()),
        }
    }
}
