//! The shared error taxonomy: `Validation`, `Unauthenticated`,
//! `Forbidden`, `NotFound`, `Conflict`, `Transient`, `Internal`.
//!
//! Both `chat_server` and `notify_server` define their own thin
//! service-level error enum and map it down to this taxonomy, the way
//! the teacher's `fechatter_server::error::AppError` maps down to
//! `fechatter_core::error::CoreError`.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
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

    #[error("transient error: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl CoreError {
    /// Maps a raised sqlx error onto the taxonomy by inspecting constraint
    /// names, mirroring `CoreError::from_database_error` in the teacher.
    pub fn from_database_error(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if let Some(constraint) = db_err.constraint() {
                if constraint.contains("unique") || db_err.is_unique_violation() {
                    return CoreError::Conflict(format!("unique constraint violated: {constraint}"));
                }
                if db_err.is_foreign_key_violation() {
                    return CoreError::NotFound(format!("referenced row missing: {constraint}"));
                }
            }
        }
        if matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
            return CoreError::Transient(err.to_string());
        }
        CoreError::Database(err)
    }

    /// The REST status code and WebSocket error-frame code share one
    /// vocabulary.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation",
            CoreError::Unauthenticated => "unauthenticated",
            CoreError::Forbidden => "forbidden",
            CoreError::NotFound(_) => "not_found",
            CoreError::Conflict(_) => "conflict",
            CoreError::TooLate => "too_late",
            CoreError::LastAdmin => "last_admin",
            CoreError::Transient(_) => "transient",
            CoreError::Internal(_) | CoreError::Database(_) => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::Transient(_))
    }
}

/// Wire shape of both the REST error body and the WebSocket `error` frame
/// payload: a REST status and a `{code, message}` frame share one code
/// vocabulary.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorFrame {
    pub code: String,
    pub message: String,
}

impl From<&CoreError> for ErrorFrame {
    fn from(err: &CoreError) -> Self {
        ErrorFrame {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// Lets each binary's own error enum declare how it folds into the shared
/// taxonomy, the way `fechatter_server::error::ErrorMapper` does.
pub trait ErrorMapper {
    type Error;

    fn map_error(error: CoreError) -> Self::Error;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_vocabulary_is_stable() {
        assert_eq!(CoreError::TooLate.code(), "too_late");
        assert_eq!(CoreError::LastAdmin.code(), "last_admin");
        assert_eq!(CoreError::Forbidden.code(), "forbidden");
    }

    #[test]
    fn only_transient_is_retryable() {
        assert!(CoreError::Transient("db down".into()).is_retryable());
        assert!(!CoreError::Conflict("x".into()).is_retryable());
    }
}
