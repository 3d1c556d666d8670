//! Request filters for axum services.
//!
//! Two independent middleware units for a request pipeline:
//!
//! - **Maintenance gate**: while maintenance mode is active, only
//!   whitelisted principals (and, unless blocked, anonymous requests) get
//!   through; everyone else receives `503 Maintenance active`.
//! - **Slow request logger**: times every request and logs headers, POST
//!   parameters and the progress trace of requests slower than a threshold.
//!
//! # Wiring
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use request_filters::{app, config::{ConfigStore, Settings}};
//!
//! # fn wire() -> Result<(), envy::Error> {
//! let settings = Settings::from_env()?;
//! let store = ConfigStore::new(&settings);
//!
//! let routes = Router::new().route("/", get(|| async { "hello" }));
//! let app: Router = app::with_filters(routes, &store, settings.identity_header.clone());
//!
//! // later, on reconfiguration
//! store.activate(&Settings::from_env()?);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

pub use config::{ConfigStore, Settings};
pub use error::{AppError, CaptureError};
pub use models::{
    diagnostic::DiagnosticRecord, identity::RequestIdentity, maintenance::MaintenanceConfig,
    slow_request::SlowRequestConfig,
};
pub use services::{
    access_gate::{AccessGate, admit},
    progress::ProgressTracker,
    slow_request::{Clock, DiagnosticSink, DiagnosticSource, SlowRequestRecorder, capture},
};
