use actix_web::{http::StatusCode, HttpResponse};
use thiserror::Error;

use crate::models::ErrorResponse;

/// Engine-wide error taxonomy
///
/// Every handler returns `Result<HttpResponse, EngineError>`; the
/// `ResponseError` impl maps each kind to a status code and the standard
/// `{ error, message, status_code }` JSON body. Empty match results are
/// successes, never errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Upstream(String),
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::Validation(_) => "validation_error",
            EngineError::PreconditionFailed(_) => "precondition_failed",
            EngineError::NotFound(_) => "not_found",
            EngineError::Conflict(_) => "conflict",
            EngineError::Upstream(_) => "upstream_unavailable",
        }
    }
}

impl actix_web::error::ResponseError for EngineError {
    fn status_code(&self) -> StatusCode {
        match self {
            EngineError::Validation(_) => StatusCode::BAD_REQUEST,
            EngineError::PreconditionFailed(_) => StatusCode::PRECONDITION_FAILED,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::Conflict(_) => StatusCode::CONFLICT,
            EngineError::Upstream(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        HttpResponse::build(status).json(ErrorResponse {
            error: self.kind().to_string(),
            message: self.to_string(),
            status_code: status.as_u16(),
        })
    }
}

impl From<crate::services::PostgresError> for EngineError {
    fn from(err: crate::services::PostgresError) -> Self {
        use crate::services::PostgresError;
        match err {
            PostgresError::NotFound(msg) => EngineError::NotFound(msg),
            PostgresError::Decode(msg) => EngineError::Upstream(format!("bad stored value: {msg}")),
            PostgresError::Sqlx(e) => {
                let unique = e
                    .as_database_error()
                    .map(|d| d.is_unique_violation())
                    .unwrap_or(false);
                if unique {
                    EngineError::Conflict("duplicate row for a unique constraint".to_string())
                } else if matches!(e, sqlx::Error::RowNotFound) {
                    EngineError::NotFound("row not found".to_string())
                } else {
                    EngineError::Upstream(format!("storage error: {e}"))
                }
            }
            PostgresError::Migrate(e) => EngineError::Upstream(format!("migration error: {e}")),
        }
    }
}

impl From<crate::services::ProfileError> for EngineError {
    fn from(err: crate::services::ProfileError) -> Self {
        use crate::services::ProfileError;
        match err {
            ProfileError::NotFound(msg) => EngineError::NotFound(msg),
            other => EngineError::Upstream(format!("profile service: {other}")),
        }
    }
}

impl EngineError {
    /// True when a creation conflict should be resolved by re-fetching the
    /// winning row instead of surfacing the error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, EngineError::Conflict(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::error::ResponseError;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            EngineError::Validation("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            EngineError::PreconditionFailed("x".into()).status_code(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            EngineError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EngineError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            EngineError::Upstream("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(EngineError::Conflict("x".into()).kind(), "conflict");
        assert_eq!(
            EngineError::Upstream("x".into()).kind(),
            "upstream_unavailable"
        );
    }
}
