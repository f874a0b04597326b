use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::editor::session::SessionError;
use crate::publish::CommitError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::KindMismatch { .. }
            | SessionError::MissingIdentity
            | SessionError::UnknownField(_)
            | SessionError::InvalidValue { .. }
            | SessionError::NotUploadable(_)
            | SessionError::MissingRequired(_) => AppError::Validation(err.to_string()),
            SessionError::NoResumableDraft | SessionError::InvalidState { .. } => {
                AppError::Conflict(err.to_string())
            }
            SessionError::Storage(e) => AppError::Internal(e.into()),
            SessionError::Commit(e) => e.into(),
        }
    }
}

impl From<CommitError> for AppError {
    fn from(err: CommitError) -> Self {
        match err {
            CommitError::NotFound(id) => AppError::NotFound(format!("Content {id} not found")),
            CommitError::Rejected(msg) => AppError::UnprocessableEntity(msg),
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
            AppError::Upstream(msg) => {
                tracing::error!("Upstream error: {msg}");
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
