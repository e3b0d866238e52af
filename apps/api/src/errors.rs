use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::candidates::extraction::ExtractionError;
use crate::candidates::models::{ALLOWED_CONTENT_TYPES, MIN_RESUME_BYTES};
use crate::candidates::repository::RepositoryError;
use crate::candidates::storage::StorageError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("File too small: {0} bytes")]
    FileTooSmall(usize),

    #[error("Invalid resume content: {0}")]
    InvalidResumeContent(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Extraction error: {0}")]
    InternalExtraction(String),

    #[error("Persistence error: {0}")]
    Persistence(#[from] RepositoryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<ExtractionError> for AppError {
    fn from(err: ExtractionError) -> Self {
        match err {
            ExtractionError::InvalidContent(msg) => AppError::InvalidResumeContent(msg),
            ExtractionError::Internal(msg) => AppError::InternalExtraction(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::InvalidFileType(got) => (
                StatusCode::BAD_REQUEST,
                format!(
                    "Only PDF or DOCX files are allowed ({}); got '{got}'",
                    ALLOWED_CONTENT_TYPES.join(", ")
                ),
            ),
            AppError::FileTooSmall(_) => (
                StatusCode::BAD_REQUEST,
                format!(
                    "Uploaded file is too small or empty (minimum {MIN_RESUME_BYTES} bytes)"
                ),
            ),
            AppError::InvalidResumeContent(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::MissingField(field) => (
                StatusCode::BAD_REQUEST,
                format!("Missing required field '{field}'"),
            ),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InternalExtraction(msg) => {
                tracing::error!("Extraction error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error while reading the resume".to_string(),
                )
            }
            AppError::Persistence(e) => {
                tracing::error!("Persistence error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                )
            }
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Notification(reason) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Application saved but email could not be sent: {reason}"),
            ),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}
