//! Error types for gfpt-pt
//!
//! Validation and conflict failures reach the caller verbatim. Database and
//! other infrastructure failures are logged here and replaced by a generic
//! message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gfpt_common::api::ErrorBody;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request collides with stored state (400): duplicate entry,
    /// nothing left to bank, destination line without seed data
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Database error (500)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<gfpt_common::Error> for ApiError {
    fn from(err: gfpt_common::Error) -> Self {
        if err.is_unique_violation() {
            return ApiError::Conflict("A matching entry already exists".to_string());
        }
        match err {
            gfpt_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            gfpt_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            gfpt_common::Error::Conflict(msg) => ApiError::Conflict(msg),
            gfpt_common::Error::Database(e) => ApiError::Database(e),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::BAD_REQUEST, "CONFLICT", msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "The request could not be completed, please try again".to_string(),
                )
            }
            ApiError::Database(err) => {
                tracing::error!(error = %err, "Database failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "The database is unavailable, please try again".to_string(),
                )
            }
        };

        (status, Json(ErrorBody::new(error_code, message))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_common_errors_map_to_http_classes() {
        let cases = [
            (gfpt_common::Error::NotFound("x".into()), StatusCode::NOT_FOUND),
            (gfpt_common::Error::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (gfpt_common::Error::Conflict("x".into()), StatusCode::BAD_REQUEST),
            (gfpt_common::Error::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }

    #[test]
    fn test_internal_message_is_not_leaked() {
        let err = ApiError::Internal("connection refused at 10.0.0.3".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
