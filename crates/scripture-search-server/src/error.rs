//! HTTP-layer error mapping: the one place status codes are decided.
//!
//! Per spec §7's propagation policy, almost every error the core crate can
//! produce is already folded into a response's `failures` array by the
//! orchestrator and never reaches this layer. `ApiError` only wraps the two
//! variants that actually propagate out of [`scripture_search_core::Orchestrator::search`]:
//! `InvalidRequest` (400) and `Internal` (500).

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use scripture_search_core::Error as CoreError;

/// Thin wrapper turning a core [`CoreError`] into an axum response.
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    reason: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            CoreError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = ErrorBody {
            error: self.0.to_string(),
            reason: self.0.failure_reason(),
        };
        (status, Json(body)).into_response()
    }
}
