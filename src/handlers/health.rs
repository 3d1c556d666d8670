//! Health check endpoint for service monitoring.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::ConfigStore;

/// Health check response.
///
/// Reports which filters are currently active.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: String,

    /// Whether maintenance mode is active
    pub maintenance: bool,

    /// Whether slow requests are being recorded
    pub slow_requests: bool,

    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
}

/// Health check handler.
///
/// # Response (200 OK)
///
/// ```json
/// {
///   "status": "healthy",
///   "maintenance": false,
///   "slow_requests": true,
///   "timestamp": "2025-12-21T19:00:00Z"
/// }
/// ```
///
/// The route is mounted outside the maintenance gate so monitoring keeps
/// working while the service is closed.
pub async fn health_check(State(store): State<ConfigStore>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        maintenance: store.maintenance().enabled,
        slow_requests: store.slow_requests().enabled,
        timestamp: Utc::now(),
    })
}
