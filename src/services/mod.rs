//! Request filtering logic.
//!
//! The services hold the framework-independent core of both filters: the
//! admission decision of the maintenance gate and the timing and capture
//! logic of the slow request recorder. The axum bindings in
//! [`middleware`](crate::middleware) only adapt requests to these types.

/// Maintenance mode admission decisions
pub mod access_gate;
/// Per-request progress trace
pub mod progress;
/// Slow request timing and diagnostic capture
pub mod slow_request;

#[cfg(test)]
pub(crate) mod log_capture;
