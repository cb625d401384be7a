//! API error types and responses

use anchor_auth::AuthError;
use anchor_core::CoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::storage::StorageError;

/// API error type
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// API error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone(), None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),
            ApiError::Storage(err) => {
                let transient = err.is_transient();
                error!(error = %err, transient, "Storage failure while serving request");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    if transient { "STORAGE_TRANSIENT" } else { "STORAGE_CORRUPT" },
                    err.to_string(),
                    Some(serde_json::json!({ "retryable": transient })),
                )
            }
            ApiError::Internal(msg) => {
                error!(error = %msg, "Internal error while serving request");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg.clone(), None)
            }
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Storage(other),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MalformedSignature(msg) => ApiError::BadRequest(format!("Malformed signature: {}", msg)),
            AuthError::UnknownKey(key_id) => ApiError::NotFound(format!("Unknown public key: {}", key_id)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidPageSize(_) | CoreError::InvalidHashLink { .. } | CoreError::UnknownReferenceType(_) => {
                ApiError::BadRequest(err.to_string())
            }
            // IRIs are derived from the configured service IRI
            CoreError::InvalidIri(_) | CoreError::Serialization(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(format!("Invalid JSON: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::from(AuthError::MalformedSignature("x".into())), StatusCode::BAD_REQUEST),
            (ApiError::from(AuthError::UnknownKey("k".into())), StatusCode::NOT_FOUND),
            (ApiError::from(AuthError::KeyResolution("down".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::from(StorageError::Connection("refused".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::from(StorageError::InvalidInput("no id".into())), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED),
            (
                ApiError::from(CoreError::InvalidHashLink {
                    link: "hl:".into(),
                    reason: "empty".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::from(CoreError::InvalidIri("'urn:x' cannot have path segments".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
