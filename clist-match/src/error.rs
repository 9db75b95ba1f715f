//! Error types for clist-match

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::MatchError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request or action not allowed in the current state (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Mention already matched elsewhere (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Create/copy/match write failed; the session carries a notice (500)
    #[error("Action failed: {0}")]
    ActionFailed(String),

    /// clist-common error
    #[error("Common error: {0}")]
    Common(#[from] clist_common::Error),
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::SessionNotFound(_)
            | MatchError::PreviewSessionNotFound(_)
            | MatchError::VendorNotFound(_) => ApiError::NotFound(err.to_string()),
            MatchError::InvalidStep { .. } | MatchError::Validation(_) => {
                ApiError::BadRequest(err.to_string())
            }
            MatchError::Conflict(msg) => ApiError::Conflict(msg),
            MatchError::Mutation(msg) => ApiError::ActionFailed(msg),
            MatchError::Store(e) => ApiError::Common(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::ActionFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ACTION_FAILED", msg)
            }
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %message, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_match_error_status_mapping() {
        let cases = [
            (MatchError::SessionNotFound(Uuid::nil()), StatusCode::NOT_FOUND),
            (
                MatchError::Validation("Vendor name is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                MatchError::InvalidStep {
                    action: "skip",
                    state: "COMPLETE",
                },
                StatusCode::BAD_REQUEST,
            ),
            (MatchError::Conflict("taken".into()), StatusCode::CONFLICT),
            (
                MatchError::Mutation("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), expected);
        }
    }
}
