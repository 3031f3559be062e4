use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// API error types that can be returned from handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No tick has completed yet; data is on its way.
    #[error("Grid initializing")]
    Initializing,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            // 202: the engine is warming up, retry shortly
            ApiError::Initializing => (
                StatusCode::ACCEPTED,
                Json(ErrorResponse {
                    error: "Grid initializing...".to_string(),
                    status: Some("pending"),
                }),
            )
                .into_response(),
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: msg,
                    status: None,
                }),
            )
                .into_response(),
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "API error occurred");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: "An internal error occurred".to_string(),
                        status: None,
                    }),
                )
                    .into_response()
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::InternalError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::Initializing.into_response().status(),
            StatusCode::ACCEPTED
        );
        assert_eq!(
            ApiError::NotFound("node 9".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::InternalError("boom".into())
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
