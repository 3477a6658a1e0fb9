//! `NotifyError`, grounded in `notify_server::error::NotifyError`, folded
//! onto this workspace's actual `chat_core::CoreError` taxonomy rather
//! than the teacher's broader ad hoc variant set.

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
pub enum NotifyError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transient error: {0}")]
    Transient(String),

    #[error("sqlx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("nats error: {0}")]
    Nats(String),

    #[error("internal error: {0}")]
    AnyError(#[from] anyhow::Error),
}

impl ErrorMapper for NotifyError {
    type Error = NotifyError;

    fn map_error(error: CoreError) -> Self::Error {
        match error {
            CoreError::Validation(e) => NotifyError::Validation(e),
            CoreError::NotFound(e) => NotifyError::NotFound(e),
            CoreError::Conflict(e) => NotifyError::Conflict(e),
            CoreError::Transient(e) => NotifyError::Transient(e),
            CoreError::Database(e) => NotifyError::SqlxError(e),
            CoreError::Unauthenticated | CoreError::Forbidden => {
                NotifyError::AnyError(anyhow::anyhow!("{error}: not expected inside the notification worker"))
            }
            CoreError::TooLate | CoreError::LastAdmin | CoreError::Internal(_) => {
                NotifyError::AnyError(anyhow::anyhow!(error.to_string()))
            }
        }
    }
}

impl NotifyError {
    fn status_code(&self) -> StatusCode {
        match self {
            NotifyError::Validation(_) => StatusCode::BAD_REQUEST,
            NotifyError::NotFound(_) => StatusCode::NOT_FOUND,
            NotifyError::Conflict(_) => StatusCode::CONFLICT,
            NotifyError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            NotifyError::Nats(_) => StatusCode::SERVICE_UNAVAILABLE,
            NotifyError::SqlxError(_) | NotifyError::AnyError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            NotifyError::Validation(_) => "validation",
            NotifyError::NotFound(_) => "not_found",
            NotifyError::Conflict(_) => "conflict",
            NotifyError::Transient(_) => "transient",
            NotifyError::Nats(_) => "transient",
            NotifyError::SqlxError(_) | NotifyError::AnyError(_) => "internal",
        }
    }
}

impl IntoResponse for NotifyError {
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
