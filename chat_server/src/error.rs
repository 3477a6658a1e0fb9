//! `AppError`, the chat server's service-level error enum, grounded in
//! `fechatter_server::error::AppError`: maps to/from `chat_core::CoreError`
//! and into axum `Response`s with a stable error code vocabulary.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use chat_core::error::{CoreError, ErrorMapper};

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorOutput {
    pub code: String,
    pub error: String,
}

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("too late: unsend window has passed")]
    TooLate,

    #[error("conflict: last admin cannot be removed or demoted")]
    LastAdmin,

    #[error("transient error, please retry: {0}")]
    Transient(String),

    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    AnyError(#[from] anyhow::Error),
}

impl ErrorMapper for AppError {
    type Error = AppError;

    fn map_error(error: CoreError) -> Self::Error {
        match error {
            CoreError::Validation(e) => AppError::Validation(e),
            CoreError::Unauthenticated => AppError::Unauthenticated,
            CoreError::Forbidden => AppError::Forbidden,
            CoreError::NotFound(e) => AppError::NotFound(e),
            CoreError::Conflict(e) => AppError::Conflict(e),
            CoreError::TooLate => AppError::TooLate,
            CoreError::LastAdmin => AppError::LastAdmin,
            CoreError::Transient(e) => AppError::Transient(e),
            CoreError::Internal(e) => AppError::AnyError(anyhow::anyhow!(e)),
            CoreError::Database(e) => AppError::SqlxError(e),
        }
    }
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::LastAdmin => StatusCode::CONFLICT,
            AppError::TooLate => StatusCode::CONFLICT,
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::SqlxError(_) | AppError::AnyError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::TooLate => "too_late",
            AppError::LastAdmin => "last_admin",
            AppError::Transient(_) => "transient",
            AppError::SqlxError(_) | AppError::AnyError(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "internal error");
        }
        let body = ErrorOutput {
            code: self.code().to_string(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
