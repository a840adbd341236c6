//! Error types and handling for the gateway.
//!
//! This module provides a unified error type [`AppError`] that wraps the
//! failure modes of the three completion endpoints and implements proper
//! HTTP response conversion.
//!
//! The HTTP conversion only applies to errors raised before a response
//! commits to SSE. Once streaming has started, errors are delivered as
//! in-band events instead (see `api::streaming`).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Main error type for the application.
///
/// All errors in the application should be converted to this type for
/// consistent handling.
#[derive(Error, Debug)]
pub enum AppError {
    /// Client sent a request that fails validation (missing messages,
    /// streaming disabled, malformed body). Always surfaced before any
    /// SSE output is written.
    #[error("{0}")]
    Validation(String),

    /// Upstream completion API failure (connect error, non-2xx status,
    /// broken or stalled stream)
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Knowledge retrieval failure during RAG orchestration
    #[error("retrieval error: {0}")]
    Retrieval(String),

    /// Audio asset could not be loaded
    #[error("asset error: {0}")]
    Asset(String),

    /// JSON serialization/deserialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal server errors with custom message
    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::Upstream("request timed out".to_string())
        } else {
            // Strip reqwest's url from the message, clients only need the cause
            AppError::Upstream(err.without_url().to_string())
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Retrieval(_)
            | AppError::Asset(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // {"detail": ...} is the error contract shared by all endpoints
        let body = Json(json!({ "detail": self.to_string() }));

        (status, body).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::Validation("missing messages".to_string());
        assert_eq!(err.to_string(), "missing messages");

        let err = AppError::Upstream("connection refused".to_string());
        assert_eq!(err.to_string(), "upstream error: connection refused");

        let err = AppError::Internal("test error".to_string());
        assert_eq!(err.to_string(), "internal server error: test error");
    }

    #[test]
    fn test_validation_error_response() {
        let err = AppError::Validation("chat completions require streaming".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_upstream_error_response() {
        let err = AppError::Upstream("HTTP 500".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_retrieval_error_response() {
        let err = AppError::Retrieval("knowledge base unavailable".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_asset_error_response() {
        let err = AppError::Asset("failed to read PCM file".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_internal_error_response() {
        let err = AppError::Internal("custom error".to_string());
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_serialization_error_response() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err = AppError::Serialization(json_err);
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_error_body_contains_detail() {
        let err = AppError::Validation("missing messages".to_string());
        let response = err.into_response();

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["detail"], "missing messages");
    }

    #[tokio::test]
    async fn test_result_type_alias() {
        fn returns_result() -> Result<String> {
            Ok("success".to_string())
        }

        let result = returns_result();
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), "success");
    }
}
