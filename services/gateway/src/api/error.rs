//! HTTP error envelope.
//!
//! Every failing handler answers with `{ code, message, request_id }` and a
//! status that matches `code`. Handlers map [`StoreError`] variants to one of
//! the builders below; the auth helpers use the 401 and 403 builders.
//!
//! Storage failures are logged here and never echoed to the client.
use crate::api::types::ErrorResponse;
use crate::store::StoreError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &str, message: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                code: code.to_string(),
                message: message.to_string(),
                request_id: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_found", message)
}

/// 404 with code `not_enabled`, for routes switched off by configuration.
pub fn api_not_enabled(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "not_enabled", message)
}

/// 409 with a caller-chosen code such as `duplicate_hash`.
pub fn api_conflict(code: &str, message: &str) -> ApiError {
    ApiError::new(StatusCode::CONFLICT, code, message)
}

/// 500 for a failed store call. The store error goes to the log only.
pub fn api_internal(message: &str, err: &StoreError) -> ApiError {
    tracing::error!(error = ?err, context = message, "storage call failed");
    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    ApiError::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

/// 403 for role denials and for writes a record refuses (sealed documents,
/// the same approver on both payment panels).
pub fn api_forbidden(message: &str) -> ApiError {
    ApiError::new(StatusCode::FORBIDDEN, "forbidden", message)
}

/// 400 for malformed bodies, out-of-range fields and unknown enum values.
pub fn api_validation_error(message: &str) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
}
