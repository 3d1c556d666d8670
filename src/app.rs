//! Router assembly.
//!
//! Wires the filters around a router in the order the host runs them:
//!
//! ```text
//! request → resolve_identity → slow_request_logger → maintenance_gate → handler
//! ```

use axum::{Router, http::HeaderName, middleware as axum_middleware, routing::get};
use tower_http::trace::TraceLayer;

use crate::{
    config::{ConfigStore, Settings},
    handlers,
    middleware::{identity, maintenance, slow_request},
    services::{access_gate::AccessGate, slow_request::SlowRequestRecorder},
};

/// Wrap every route of `router` with the request filters.
pub fn with_filters<S>(router: Router<S>, store: &ConfigStore, identity_header: HeaderName) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    with_recorder(router, store, SlowRequestRecorder::new(store), identity_header)
}

/// Like [`with_filters`], with a preconfigured recorder (custom clock or sink).
pub fn with_recorder<S>(
    router: Router<S>,
    store: &ConfigStore,
    recorder: SlowRequestRecorder,
    identity_header: HeaderName,
) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    // Layers run outermost-last: the identity resolver sees the request first
    router
        .layer(axum_middleware::from_fn_with_state(
            AccessGate::new(store),
            maintenance::maintenance_gate,
        ))
        .layer(axum_middleware::from_fn_with_state(
            recorder,
            slow_request::slow_request_logger,
        ))
        .layer(axum_middleware::from_fn_with_state(
            identity::IdentityResolver::new(identity_header),
            identity::resolve_identity,
        ))
}

/// The service router: health check plus the filtered fallback.
///
/// Everything except `/health` runs through the filters. Without routes of
/// its own the service answers filtered requests with 404.
pub fn router(store: &ConfigStore, settings: &Settings) -> Router {
    let filtered = with_filters(
        Router::new().fallback(handlers::fallback::not_found),
        store,
        settings.identity_header.clone(),
    );

    Router::new()
        // Public route (never gated)
        .route("/health", get(handlers::health::health_check))
        .with_state(store.clone())
        .merge(filtered)
        .layer(TraceLayer::new_for_http())
}
