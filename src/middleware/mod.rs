//! HTTP middleware components.
//!
//! Middleware are functions that wrap the next handler in the chain.
//! The filters in this crate:
//! - Resolve the principal of a request (identity)
//! - Block requests while maintenance mode is active (maintenance)
//! - Log requests that took too long (slow_request)
//!
//! All of them are meant for `axum::middleware::from_fn_with_state`.

/// Principal resolution from a trusted proxy header
pub mod identity;
/// Maintenance mode gate
pub mod maintenance;
/// Slow request logging
pub mod slow_request;
