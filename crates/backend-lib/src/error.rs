// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use recipebox_common::ErrorBody;
use thiserror::Error;

use crate::storage::StoreError;

/// Application error types surfaced to HTTP clients
#[derive(Error, Debug)]
pub enum AppError {
    /// Same message whichever of username or password was wrong
    #[error("Invalid Username or Password")]
    InvalidCredentials,

    /// Missing, malformed or rejected proof of identity
    #[error("{0}")]
    Unauthorized(String),

    /// Malformed request body or query
    #[error("{0}")]
    Validation(String),

    #[error("Token is not yet eligible for refresh")]
    RefreshNotEligible,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Too many authentication attempts, please try again later")]
    AuthRateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) | AppError::RefreshNotEligible => StatusCode::BAD_REQUEST,
            AppError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::AuthRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable code attached to log lines for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidCredentials => "AUTH_001",
            AppError::Unauthorized(_) => "AUTH_002",
            AppError::RefreshNotEligible => "AUTH_003",
            AppError::AuthRateLimited => "AUTH_004",
            AppError::Validation(_) => "VAL_001",
            AppError::Store(StoreError::NotFound(_)) => "NF_001",
            AppError::Store(StoreError::Timeout(_)) => "STORE_002",
            AppError::Store(_) => "STORE_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Message written to the response body.
    ///
    /// Store failures carry the store's own message; internal errors are only
    /// spelled out in debug builds.
    pub fn client_message(&self) -> String {
        match self {
            AppError::Internal(_) if !cfg!(debug_assertions) => {
                "An internal server error occurred".to_string()
            },
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code, error = %self, "request failed");
        } else {
            tracing::debug!(code, status = status.as_u16(), error = %self, "request rejected");
        }

        let body = ErrorBody {
            error: self.client_message(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_of(response: Response) -> ErrorBody {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(AppError::InvalidCredentials.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::unauthorized("Invalid token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::validation("bad").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::RefreshNotEligible.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Store(StoreError::NotFound("r1".to_string())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Store(StoreError::Timeout(Duration::from_millis(5))).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::AuthRateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn test_app_error_error_codes() {
        assert_eq!(AppError::InvalidCredentials.error_code(), "AUTH_001");
        assert_eq!(AppError::Internal("x".to_string()).error_code(), "INT_001");
        assert_eq!(
            AppError::Store(StoreError::Timeout(Duration::from_millis(5))).error_code(),
            "STORE_002"
        );
        assert_eq!(
            AppError::Store(StoreError::Io(std::io::ErrorKind::PermissionDenied.into())).error_code(),
            "STORE_001"
        );
        assert_eq!(
            AppError::Store(StoreError::NotFound("r1".to_string())).error_code(),
            "NF_001"
        );
    }

    #[tokio::test]
    async fn invalid_credentials_body_is_uniform() {
        let response = AppError::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .contains("application/json"));
        let body = body_of(response).await;
        assert_eq!(body.error, "Invalid Username or Password");
    }

    #[tokio::test]
    async fn store_failures_carry_store_message() {
        let response = AppError::Store(StoreError::Timeout(Duration::from_millis(250)))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_of(response).await;
        assert!(body.error.contains("timed out after 250ms"));
    }

    #[test]
    fn test_error_from_store_error() {
        let app_err: AppError = StoreError::NotFound("abc".to_string()).into();
        assert!(matches!(app_err, AppError::Store(StoreError::NotFound(_))));
    }
}
