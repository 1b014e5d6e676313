//! API error handling.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use buildtrack_core::BuildId;
use serde_json::json;

/// API error type.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Unauthorized(String),
    Conflict(String),
    Internal(String),
    /// The build was recorded but could not be handed to CI.
    DispatchFailed { message: String, build_id: BuildId },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::DispatchFailed { message, build_id } => {
                let body = Json(json!({
                    "error": message,
                    "build_id": build_id,
                }));
                return (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<buildtrack_core::Error> for ApiError {
    fn from(err: buildtrack_core::Error) -> Self {
        use buildtrack_core::Error;

        match err {
            Error::Validation(msg) => ApiError::BadRequest(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            Error::NotFound(id) => ApiError::NotFound(format!("build not found: {}", id)),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Dispatch { build_id, message } => ApiError::DispatchFailed { message, build_id },
            Error::Store(msg) => ApiError::Internal(msg),
        }
    }
}

impl From<buildtrack_db::DbError> for ApiError {
    fn from(err: buildtrack_db::DbError) -> Self {
        buildtrack_core::Error::from(err).into()
    }
}
