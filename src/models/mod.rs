//! Value types shared by the request filters.
//!
//! This module contains the immutable configuration snapshots and the
//! per-request data the filters work with.

/// Per-request principal information supplied by the host
pub mod identity;
/// Maintenance mode configuration
pub mod maintenance;
/// Slow request configuration
pub mod slow_request;
/// Diagnostic record emitted for slow requests
pub mod diagnostic;
