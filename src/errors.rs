use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{repository::RepositoryError, storage::StorageError};

/// ApiError
///
/// The single error type returned by handlers and extractors. Every variant maps to one
/// HTTP status and is rendered as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Access denied. No valid token provided.")]
    Unauthorized,
    #[error("Invalid email or password.")]
    InvalidCredentials,
    #[error("Access denied.")]
    Forbidden,
    #[error("{0}")]
    ForbiddenWith(String),
    #[error("Invalid ID.")]
    InvalidId,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Upload(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Internal server error.")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str) -> Self {
        ApiError::NotFound(format!("The {what} with the given ID was not found."))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden | ApiError::ForbiddenWith(_) => StatusCode::FORBIDDEN,
            ApiError::InvalidId | ApiError::Validation(_) | ApiError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            // The detail stays in the logs; clients only see the generic message.
            tracing::error!(error = %detail, "request failed");
        }
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => ApiError::not_found(what),
            RepositoryError::Conflict(msg) => ApiError::Conflict(msg),
            RepositoryError::Database(e) => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_request_pipeline() {
        assert_eq!(ApiError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::InvalidId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Upload("too many files".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::not_found("category").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_errors_hide_their_detail() {
        let err = ApiError::Internal("connection refused".into());
        assert_eq!(err.to_string(), "Internal server error.");
    }

    #[test]
    fn repository_conflicts_become_409() {
        let err: ApiError = RepositoryError::Conflict("phone already registered".into()).into();
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.to_string(), "phone already registered");
    }
}
