//! Error types and HTTP response conversion

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::repository::{ErrorCategory, RepositoryError};

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
///
/// Large error variants are boxed to reduce stack size
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Configuration that parsed but cannot be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Structured repository error with operation context
    #[error("{0}")]
    Repository(RepositoryError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Bad request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded {
        /// Whole seconds until the client's bucket holds a token again
        retry_after_secs: u64,
    },

    /// Resource conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Validation error (422)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,

    /// Seconds to wait before retrying, set on 429 responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            status: status.as_u16(),
            retry_after_secs: None,
        }
    }

    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
            retry_after_secs: None,
        }
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Error::Config(e) => {
                tracing::error!("Configuration error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "CONFIG_ERROR",
                        "Internal server error",
                    ),
                )
            }

            Error::InvalidConfig(msg) => {
                tracing::error!("Invalid configuration: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "CONFIG_ERROR",
                        "Internal server error",
                    ),
                )
            }

            Error::Repository(ref e) => {
                let status = match e.category() {
                    ErrorCategory::NotFound => StatusCode::NOT_FOUND,
                    ErrorCategory::Conflict => StatusCode::CONFLICT,
                    ErrorCategory::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCategory::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
                };

                if status.is_server_error() {
                    tracing::error!(
                        operation = %e.operation,
                        kind = %e.kind,
                        entity_type = ?e.entity_type,
                        retriable = e.is_retriable(),
                        "Repository error: {}", e.message
                    );
                }

                let code = format!("REPOSITORY_{}", e.kind.to_string().to_uppercase());

                // Internal details stay in the log
                let user_message = match e.category() {
                    ErrorCategory::NotFound => "Resource not found",
                    ErrorCategory::Conflict => "Operation conflicts with existing data",
                    ErrorCategory::Cancelled => "Request cancelled before completion",
                    ErrorCategory::Persistence => "Database operation failed",
                };

                (status, ErrorResponse::with_code(status, code, user_message))
            }

            Error::Io(e) => {
                tracing::error!("I/O error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "IO_ERROR",
                        "I/O operation failed",
                    ),
                )
            }

            Error::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::with_code(StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ),

            Error::RateLimitExceeded { retry_after_secs } => {
                let mut body = ErrorResponse::with_code(
                    StatusCode::TOO_MANY_REQUESTS,
                    "RATE_LIMIT_EXCEEDED",
                    "Too many requests",
                );
                body.retry_after_secs = Some(retry_after_secs);

                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                return response;
            }

            Error::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::with_code(StatusCode::CONFLICT, "CONFLICT", msg),
            ),

            Error::ValidationError(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::with_code(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", msg),
            ),

            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::with_code(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INTERNAL_ERROR",
                        "Internal server error",
                    ),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

// Manual From implementations for boxed errors
impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<RepositoryError> for Error {
    fn from(err: RepositoryError) -> Self {
        Error::Repository(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryOperation;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_repository_not_found_maps_to_404() {
        let err: Error =
            RepositoryError::not_found(RepositoryOperation::FindOne, "Account", "abc").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["code"], "REPOSITORY_NOT_FOUND");
        assert_eq!(body["status"], 404);
    }

    #[tokio::test]
    async fn test_repository_conflict_maps_to_409() {
        let err: Error = RepositoryError::conflict(RepositoryOperation::Update, "stale").into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_cancelled_maps_to_503() {
        let err: Error =
            RepositoryError::cancelled(RepositoryOperation::Count, "request cancelled").into();
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_persistence_error_hides_details() {
        let err: Error =
            RepositoryError::database_error(RepositoryOperation::Create, "disk I/O error").into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Database operation failed");
    }

    #[tokio::test]
    async fn test_rate_limit_sets_retry_after() {
        let response = Error::RateLimitExceeded { retry_after_secs: 3 }.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "3");

        let body = body_json(response).await;
        assert_eq!(body["code"], "RATE_LIMIT_EXCEEDED");
        assert_eq!(body["status"], 429);
        assert_eq!(body["retry_after_secs"], 3);
    }

    #[tokio::test]
    async fn test_validation_maps_to_422() {
        let response = Error::ValidationError("email is invalid".into()).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["error"], "email is invalid");
        assert!(body.get("retry_after_secs").is_none());
    }
}
