//! Request Filters - Main Application Entry Point
//!
//! Runs the maintenance gate and the slow request logger in front of an
//! otherwise empty axum service. Useful on its own as a maintenance
//! front, and as a reference for wiring the filters into a real router.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Publish it in the configuration store
//! 3. Reload the configuration on SIGHUP (unix)
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

use request_filters::{
    app,
    config::{ConfigStore, Settings},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let settings = Settings::from_env()?;
    let store = ConfigStore::new(&settings);
    tracing::info!("Configuration loaded");

    #[cfg(unix)]
    tokio::spawn(reload_on_hangup(store.clone()));

    let app = app::router(&store, &settings);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", settings.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Re-read `.env` and the environment on every SIGHUP and publish the result.
///
/// The identity header and port are wired at startup and stay as they are.
#[cfg(unix)]
async fn reload_on_hangup(store: ConfigStore) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = match signal(SignalKind::hangup()) {
        Ok(hangup) => hangup,
        Err(err) => {
            tracing::error!(error = %err, "cannot listen for SIGHUP, configuration reload disabled");
            return;
        }
    };

    while hangup.recv().await.is_some() {
        match Settings::reload_from_env() {
            Ok(settings) => {
                store.activate(&settings);
                tracing::info!("Configuration reloaded");
            }
            Err(err) => tracing::error!(error = %err, "configuration reload failed, keeping current"),
        }
    }
}
