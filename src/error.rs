// HTTP API error types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failure from a persistence or object-storage backend.
///
/// Every operation that touches the external store rewraps the underlying
/// driver/client error into this type; raw transport errors never cross the
/// core boundary.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct StorageError {
    pub message: String,
}

impl StorageError {
    pub fn new(context: &str, cause: impl std::fmt::Display) -> Self {
        Self { message: format!("{}: {}", context, cause) }
    }
}

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug, Error)]
pub enum ApiError {
    // 401 Unauthorized
    #[error("{0}")]
    Authentication(String),

    // 404 Not Found
    #[error("{0}")]
    NotFound(String),

    // 422 Unprocessable Entity
    #[error("{0}")]
    Validation(String),

    // 500 Internal Server Error
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn authentication(message: impl Into<String>) -> Self {
        ApiError::Authentication(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-safe detail string. Storage causes are logged server-side and
    /// replaced with a generic message in the response body.
    pub fn detail(&self) -> String {
        match self {
            ApiError::Storage(err) => {
                tracing::error!(error = %err.message, "storage failure");
                "An internal storage error occurred".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = json!({ "detail": self.detail() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_carries_cause() {
        let err = StorageError::new("Failed to get book", "connection refused");
        assert_eq!(err.to_string(), "Failed to get book: connection refused");
    }

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::authentication("x").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::validation("x").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let storage: ApiError = StorageError::new("a", "b").into();
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn storage_detail_is_generic() {
        let err: ApiError = StorageError::new("Failed to list books", "password leaked").into();
        assert!(!err.detail().contains("password"));
    }
}
