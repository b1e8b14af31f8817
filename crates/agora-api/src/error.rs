use std::collections::HashMap;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

/// The single error taxonomy for the API. Every handler returns this and the
/// mapping to status codes happens exactly once, here.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Per-field validation failures, returned together as a flat
    /// field-to-message map so clients can render all errors at once.
    #[error("validation failed")]
    Validation(HashMap<String, String>),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    /// Unexpected failures (storage included). Logged at the boundary; the
    /// client only ever sees a generic message.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Single-field validation error, the common case.
    pub fn field(name: &str, message: &str) -> Self {
        let mut errors = HashMap::new();
        errors.insert(name.to_string(), message.to_string());
        ApiError::Validation(errors)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(fields) => {
                (StatusCode::BAD_REQUEST, Json(fields)).into_response()
            }
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": message })),
            )
                .into_response(),
            ApiError::Internal(err) => {
                error!("request failed: {:#}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "Something went wrong" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_maps_to_400() {
        let res = ApiError::field("name", "Name must not be empty").into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_maps_to_500() {
        let res = ApiError::Internal(anyhow::anyhow!("db exploded")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
