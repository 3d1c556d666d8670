//! Application configuration management.
//!
//! Settings are read from environment variables with the `envy` crate. The
//! same loader accepts any key/value payload through [`Settings::from_pairs`],
//! which is how a reconfiguration delivers a fresh set of values.
//!
//! Every setting falls back to its documented default when it is missing or
//! cannot be parsed, so a broken value never takes the service down.
//!
//! The parsed snapshots are published through a [`ConfigStore`]. Readers
//! always see one complete snapshot, never a mix of old and new values.

use std::collections::HashSet;
use std::str::FromStr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::http::HeaderName;
use serde::Deserialize;

use crate::models::maintenance::MaintenanceConfig;
use crate::models::slow_request::{
    DEFAULT_MAX_BODY_BYTES, DEFAULT_THRESHOLD_MILLIS, SlowRequestConfig,
};

/// Header carrying the principal name set by the authenticating proxy.
pub const DEFAULT_IDENTITY_HEADER: &str = "x-remote-user";

/// Shared, atomically replaceable configuration snapshot.
pub type Shared<T> = Arc<ArcSwap<T>>;

/// Raw values as delivered by the configuration source.
///
/// # Environment Variables
///
/// - `MAINTENANCE_ENABLED`: enable maintenance mode (default `false`)
/// - `MAINTENANCE_ALLOWED_USERS`: comma-separated whitelist (default `admin`)
/// - `MAINTENANCE_BLOCK_ANONYMOUS`: reject anonymous requests too (default `false`)
/// - `SLOW_REQUESTS_ENABLED`: time requests (default `false`)
/// - `SLOW_REQUESTS_TIME_LIMIT`: threshold in milliseconds (default `5000`)
/// - `SLOW_REQUESTS_MAX_BODY_BYTES`: largest form body copied for capture (default `65536`)
/// - `IDENTITY_HEADER`: trusted principal header (default `x-remote-user`)
/// - `SERVER_PORT`: HTTP server port (default `3000`)
#[derive(Debug, Default, Deserialize)]
struct RawSettings {
    maintenance_enabled: Option<String>,
    maintenance_allowed_users: Option<String>,
    maintenance_block_anonymous: Option<String>,
    slow_requests_enabled: Option<String>,
    slow_requests_time_limit: Option<String>,
    slow_requests_max_body_bytes: Option<String>,
    identity_header: Option<String>,
    server_port: Option<String>,
}

/// Typed settings of one activation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub maintenance: MaintenanceConfig,
    pub slow_requests: SlowRequestConfig,

    /// Request header the identity layer reads the principal name from
    pub identity_header: HeaderName,

    pub server_port: u16,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            maintenance: MaintenanceConfig::default(),
            slow_requests: SlowRequestConfig::default(),
            identity_header: HeaderName::from_static(DEFAULT_IDENTITY_HEADER),
            server_port: default_port(),
        }
    }
}

/// Default port if SERVER_PORT environment variable is not set.
fn default_port() -> u16 {
    3000
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and converts them into typed settings.
    ///
    /// # Errors
    ///
    /// Returns an error only if the environment cannot be read at all.
    /// Individual malformed values are replaced by their defaults.
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        envy::from_env::<RawSettings>().map(Self::from_raw)
    }

    /// Re-read the `.env` file, letting it override the current environment,
    /// then load settings as [`from_env`](Self::from_env) does.
    pub fn reload_from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv_override().ok();

        envy::from_env::<RawSettings>().map(Self::from_raw)
    }

    /// Load settings from an arbitrary key/value payload.
    ///
    /// Keys use the same upper-case names as the environment variables.
    pub fn from_pairs<I>(values: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter::<_, RawSettings>(values).map(Self::from_raw)
    }

    fn from_raw(raw: RawSettings) -> Self {
        let defaults = Settings::default();

        let allowed_principals = match raw.maintenance_allowed_users {
            Some(list) => parse_list(&list),
            None => defaults.maintenance.allowed_principals,
        };

        let identity_header = raw
            .identity_header
            .and_then(|name| match HeaderName::from_bytes(name.trim().as_bytes()) {
                Ok(header) => Some(header),
                Err(_) => {
                    tracing::warn!(key = "IDENTITY_HEADER", value = %name, "invalid header name, using default");
                    None
                }
            })
            .unwrap_or(defaults.identity_header);

        Self {
            maintenance: MaintenanceConfig {
                enabled: parse_bool(
                    "MAINTENANCE_ENABLED",
                    raw.maintenance_enabled,
                    defaults.maintenance.enabled,
                ),
                allowed_principals,
                block_anonymous: parse_bool(
                    "MAINTENANCE_BLOCK_ANONYMOUS",
                    raw.maintenance_block_anonymous,
                    defaults.maintenance.block_anonymous,
                ),
            },
            slow_requests: SlowRequestConfig {
                enabled: parse_bool(
                    "SLOW_REQUESTS_ENABLED",
                    raw.slow_requests_enabled,
                    defaults.slow_requests.enabled,
                ),
                threshold_millis: parse_or(
                    "SLOW_REQUESTS_TIME_LIMIT",
                    raw.slow_requests_time_limit,
                    DEFAULT_THRESHOLD_MILLIS,
                ),
                max_body_bytes: parse_or(
                    "SLOW_REQUESTS_MAX_BODY_BYTES",
                    raw.slow_requests_max_body_bytes,
                    DEFAULT_MAX_BODY_BYTES,
                ),
            },
            identity_header,
            server_port: parse_or("SERVER_PORT", raw.server_port, defaults.server_port),
        }
    }
}

fn parse_bool(key: &str, value: Option<String>, default: bool) -> bool {
    let Some(value) = value else {
        return default;
    };

    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => true,
        "false" | "0" | "no" | "off" => false,
        _ => {
            tracing::warn!(key, value = %value, default, "malformed boolean setting, using default");
            default
        }
    }
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> T
where
    T: FromStr + std::fmt::Display + Copy,
{
    let Some(value) = value else {
        return default;
    };

    value.trim().parse().unwrap_or_else(|_| {
        tracing::warn!(key, value = %value, %default, "malformed setting, using default");
        default
    })
}

fn parse_list(value: &str) -> HashSet<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Holder of the live configuration snapshots.
///
/// Cloning is cheap: all clones share the same snapshots, so a store handed
/// to the filters at wiring time observes every later [`activate`](Self::activate).
#[derive(Debug, Clone)]
pub struct ConfigStore {
    maintenance: Shared<MaintenanceConfig>,
    slow_requests: Shared<SlowRequestConfig>,
}

impl ConfigStore {
    pub fn new(settings: &Settings) -> Self {
        let store = Self {
            maintenance: Arc::new(ArcSwap::from_pointee(settings.maintenance.clone())),
            slow_requests: Arc::new(ArcSwap::from_pointee(settings.slow_requests)),
        };
        store.log_activation();
        store
    }

    /// Publish a new set of snapshots.
    ///
    /// Each component's snapshot is replaced as a whole; a request that
    /// already loaded the previous snapshot keeps using it until it finishes.
    pub fn activate(&self, settings: &Settings) {
        self.maintenance.store(Arc::new(settings.maintenance.clone()));
        self.slow_requests.store(Arc::new(settings.slow_requests));
        self.log_activation();
    }

    pub fn maintenance(&self) -> Arc<MaintenanceConfig> {
        self.maintenance.load_full()
    }

    pub fn slow_requests(&self) -> Arc<SlowRequestConfig> {
        self.slow_requests.load_full()
    }

    pub(crate) fn maintenance_handle(&self) -> Shared<MaintenanceConfig> {
        Arc::clone(&self.maintenance)
    }

    pub(crate) fn slow_requests_handle(&self) -> Shared<SlowRequestConfig> {
        Arc::clone(&self.slow_requests)
    }

    fn log_activation(&self) {
        let maintenance = self.maintenance.load();
        if maintenance.enabled {
            let mut allowed: Vec<&str> = maintenance
                .allowed_principals
                .iter()
                .map(String::as_str)
                .collect();
            allowed.sort_unstable();
            tracing::info!(
                allowed = ?allowed,
                block_anonymous = maintenance.block_anonymous,
                "Maintenance mode active"
            );
        } else {
            tracing::info!("Maintenance mode inactive");
        }

        let slow_requests = self.slow_requests.load();
        if slow_requests.enabled {
            tracing::info!(
                "Logs requests slower than {} milliseconds",
                slow_requests.threshold_millis
            );
        }
    }
}
