// Mapping of core errors onto HTTP responses
use crate::domain::error::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn view_not_open(device_id: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            format!("no open view for device {}", device_id),
        )
    }
}

impl From<TelemetryError> for ApiError {
    fn from(err: TelemetryError) -> Self {
        let status = match &err {
            TelemetryError::Validation(_) => StatusCode::BAD_REQUEST,
            TelemetryError::MissingCredential => StatusCode::UNAUTHORIZED,
            TelemetryError::Transport(_)
            | TelemetryError::Status { .. }
            | TelemetryError::Decode(_) => StatusCode::BAD_GATEWAY,
            TelemetryError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        Self::new(status, status.canonical_reason().unwrap_or("error"))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}
