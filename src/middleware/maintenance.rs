//! Maintenance mode middleware.
//!
//! Runs the [`AccessGate`] before the next handler. Rejected requests never
//! reach the handler; they get `503 Service Unavailable` with the plain
//! text body `Maintenance active`.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::AppError, models::identity::RequestIdentity, services::access_gate::AccessGate};

/// Maintenance gate middleware function.
///
/// # Flow
///
/// 1. Take the [`RequestIdentity`] the host attached to the request
/// 2. Check it against the current maintenance snapshot
/// 3. Admitted: call the next handler
/// 4. Rejected: return `AppError::MaintenanceActive` (503)
///
/// A request without any identity extension is rejected while maintenance
/// mode is active.
pub async fn maintenance_gate(
    State(gate): State<AccessGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    gate.check(request.extensions().get::<RequestIdentity>())?;

    Ok(next.run(request).await)
}
