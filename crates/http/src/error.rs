//! Error handling for the bookshelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub success: bool,
    pub error: u16,
    pub message: String,
}

/// Application error types that map to HTTP responses
#[derive(Error, Debug)]
pub enum AppError {
    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    #[error("not found: {reason}")]
    NotFound { reason: String },

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request timed out")]
    RequestTimeout,

    #[error("unprocessable: {reason}")]
    Unprocessable { reason: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a bad request error
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    /// Create an unprocessable error
    pub fn unprocessable(reason: impl Into<String>) -> Self {
        Self::Unprocessable {
            reason: reason.into(),
        }
    }

    /// Status code the error is reported with
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short public message. Never carries the underlying reason.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::BadRequest { .. } => "bad request",
            AppError::NotFound { .. } => "resource not found",
            AppError::MethodNotAllowed => "method not allowed",
            AppError::RequestTimeout => "request timeout",
            AppError::Unprocessable { .. } => "unprocessable",
            AppError::Internal(_) => "internal server error",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            error: self.status().as_u16(),
            message: self.public_message().to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::now_v7();
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %self,
                "Request error"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %self,
                "Request error"
            );
        }

        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(error: AppError) -> (StatusCode, ErrorBody) {
        let response = error.into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_not_found_envelope() {
        let (status, body) = body_of(AppError::not_found("book 7")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            body,
            ErrorBody {
                success: false,
                error: 404,
                message: "resource not found".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (AppError::bad_request("x"), 400, "bad request"),
            (AppError::MethodNotAllowed, 405, "method not allowed"),
            (AppError::RequestTimeout, 408, "request timeout"),
            (AppError::unprocessable("x"), 422, "unprocessable"),
        ];
        for (error, code, message) in cases {
            let (status, body) = body_of(error).await;
            assert_eq!(status.as_u16(), code);
            assert_eq!(body.error, code);
            assert_eq!(body.message, message);
            assert!(!body.success);
        }
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let internal_error = anyhow::anyhow!("Database connection failed");
        let (status, body) = body_of(AppError::Internal(internal_error)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "internal server error");
    }

    #[test]
    fn test_display_keeps_reason_for_logs() {
        let error = AppError::unprocessable("title is required");
        assert_eq!(error.to_string(), "unprocessable: title is required");
    }
}
