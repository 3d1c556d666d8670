//! HTTP request handlers (route handlers).
//!
//! The service owns no business routes; it only exposes its own health.

/// Service health and filter status
pub mod health;
/// Catch-all for unrouted requests
pub mod fallback;
