//! Response envelope: `{status, data, message, heading}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::error;

use crate::domain::{ErrorKind, ServiceError};

/// Heading of every successful response.
pub const PROCESSED_HEADING: &str = "Request Processed";

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub data: T,
    pub message: String,
    pub heading: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn with_status(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            data,
            message: message.into(),
            heading: PROCESSED_HEADING.to_string(),
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let descriptor = self.kind.descriptor();
        if self.kind == ErrorKind::Internal {
            error!(message = %self.message, "Request failed");
        }
        let status =
            StatusCode::from_u16(descriptor.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ApiResponse {
            status: descriptor.status,
            data: serde_json::Value::Null,
            message: self.message,
            heading: descriptor.heading.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
