//! Error types and HTTP error response handling.
//!
//! This module defines the errors the filters can produce and how the
//! client-visible ones are converted into HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Message sent to clients rejected by the maintenance gate.
pub const MAINTENANCE_MESSAGE: &str = "Maintenance active";

/// Errors that end a request before it reaches the next handler.
///
/// # Status Code Mapping
///
/// - `MaintenanceActive` → 503 Service Unavailable
///
/// Responses are plain text with a fixed message. Internal details are
/// only ever written to the log, never to the client.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The maintenance gate rejected the request.
    #[error("Maintenance active")]
    MaintenanceActive,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MaintenanceActive => StatusCode::SERVICE_UNAVAILABLE,
        };

        (status, self.to_string()).into_response()
    }
}

/// Diagnostic record construction failed.
///
/// Raised when the host enumerates a name but then cannot produce its value.
/// The recorder logs and discards these; they never reach the client.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("header {0:?} was listed but has no readable value")]
    UnreadableHeader(String),

    #[error("parameter {0:?} was listed but has no readable value")]
    UnreadableParameter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maintenance_maps_to_503_with_fixed_message() {
        let response = AppError::MaintenanceActive.into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::MaintenanceActive.to_string(), MAINTENANCE_MESSAGE);
    }
}
