//! Error-to-HTTP response conversion.
//!
//! Route handlers return `Result<T, AppError>`; the error body is always
//! `{"error": <message>, "code": <kind>}`.

use axum::extract::rejection::QueryRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Wrapper so we can implement `IntoResponse` for an external type.
#[derive(Debug)]
pub struct AppError(pub rb_core::Error);

impl From<rb_core::Error> for AppError {
    fn from(e: rb_core::Error) -> Self {
        Self(e)
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self(rb_core::Error::Validation(rejection.body_text()))
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match &self.0 {
            rb_core::Error::NoSegments => "no_segments",
            rb_core::Error::NoMatch(_) => "no_match",
            rb_core::Error::Validation(_) => "validation_error",
            rb_core::Error::Conflict(_) => "conflict",
            rb_core::Error::Config(_) => "config_error",
            rb_core::Error::Io { .. } => "io_error",
            rb_core::Error::Tool { .. } => "tool_error",
            rb_core::Error::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self.0, "Server error in API handler");
        } else {
            tracing::debug!(status = %status, error = %self.0, "Request rejected");
        }

        let body = json!({
            "error": self.0.to_string(),
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}
