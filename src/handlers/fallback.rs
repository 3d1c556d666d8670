//! Fallback handler for paths without a route.

use axum::http::StatusCode;

/// Plain `404 Not Found`, reached only by requests the filters let through.
pub async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}
