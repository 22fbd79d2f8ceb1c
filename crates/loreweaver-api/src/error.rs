//! API error types and HTTP status mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use loreweaver_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure at startup.
    #[error("migration error: {0}")]
    Migration(#[from] DomainError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer error that implements `IntoResponse`.
#[derive(Debug)]
pub enum ApiError {
    /// A domain-layer failure, mapped by variant.
    Domain(DomainError),
    /// Undo was requested but the session has no turn to reverse.
    NothingToUndo,
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            Self::Domain(err) => {
                let (status, code) = match &err {
                    DomainError::SessionNotFound(_) => (StatusCode::NOT_FOUND, "session_not_found"),
                    DomainError::EntryNotFound(_) => (StatusCode::NOT_FOUND, "entry_not_found"),
                    DomainError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
                    DomainError::Infrastructure(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "infrastructure_error")
                    }
                };
                (status, code, err.to_string())
            }
            Self::NothingToUndo => (
                StatusCode::BAD_REQUEST,
                "nothing_to_undo",
                "no user action to undo".to_owned(),
            ),
        };

        let body = ErrorBody {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use uuid::Uuid;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_session_not_found_maps_to_404() {
        assert_eq!(
            status_of(ApiError::Domain(DomainError::SessionNotFound(
                Uuid::new_v4()
            ))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_entry_not_found_maps_to_404() {
        assert_eq!(
            status_of(ApiError::Domain(DomainError::EntryNotFound(42))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(ApiError::Domain(DomainError::Validation(
                "bad input".into()
            ))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_nothing_to_undo_maps_to_400() {
        assert_eq!(status_of(ApiError::NothingToUndo), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(ApiError::Domain(DomainError::Infrastructure(
                "db down".into()
            ))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
