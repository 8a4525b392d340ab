use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::analysis::orchestrator::{AnalysisError, AnalysisFailure};
use crate::storage::StorageError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{failure}")]
    Analysis {
        failure: AnalysisFailure,
        status_history: Vec<String>,
    },
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(path) => AppError::NotFound(format!("Object {path} not found")),
            other => AppError::Storage(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body("NOT_FOUND", &msg)),
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                error_body("VALIDATION_ERROR", &msg),
            ),
            AppError::Storage(e) => {
                tracing::error!("Storage error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("STORAGE_ERROR", "A storage error occurred"),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("INTERNAL_ERROR", "An internal error occurred"),
                )
            }
            AppError::Analysis {
                failure,
                status_history,
            } => {
                let (status, code) = analysis_status(&failure.error);
                let body = json!({
                    "error": {
                        "code": code,
                        "message": failure.status_message(),
                        "record_id": failure.record_id,
                        "stage": failure.stage,
                        "status_history": status_history,
                    }
                });
                (status, body)
            }
        };

        (status, Json(body)).into_response()
    }
}

fn analysis_status(error: &AnalysisError) -> (StatusCode, &'static str) {
    match error {
        AnalysisError::Upload(_) | AnalysisError::Storage(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
        }
        AnalysisError::Conversion(_) => (StatusCode::UNPROCESSABLE_ENTITY, "CONVERSION_ERROR"),
        AnalysisError::EmptyText => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_TEXT"),
        // The orchestrator recovers this one with fallback feedback.
        AnalysisError::AiUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "AI_UNAVAILABLE"),
        AnalysisError::Parse(_) => (StatusCode::BAD_GATEWAY, "INVALID_ANALYSIS"),
    }
}

fn error_body(code: &str, message: &str) -> serde_json::Value {
    json!({
        "error": {
            "code": code,
            "message": message
        }
    })
}
