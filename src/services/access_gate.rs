//! Maintenance mode access gate.
//!
//! While maintenance mode is active only whitelisted principals (and,
//! unless blocked, anonymous requests) get through. Everything else is
//! rejected with `503 Service Unavailable`.

use crate::config::{ConfigStore, Shared};
use crate::error::AppError;
use crate::models::identity::{ANONYMOUS, RequestIdentity};
use crate::models::maintenance::MaintenanceConfig;

/// Decide whether a request may proceed.
///
/// # Rules
///
/// Evaluated in order, the first matching rule wins:
///
/// 1. Maintenance mode disabled → admit
/// 2. No principal name (absent or empty) → reject
/// 3. Authenticated principal → admit iff whitelisted
/// 4. Declared anonymous principal → admit iff anonymous is not blocked
/// 5. Anything else → reject
pub fn admit(config: &MaintenanceConfig, identity: &RequestIdentity) -> bool {
    if !config.enabled {
        return true;
    }

    let Some(principal) = identity.name() else {
        // malformed identity, never the same as anonymous
        tracing::warn!("request without principal name during maintenance");
        return false;
    };

    if principal != ANONYMOUS {
        return config.allows(principal);
    }

    if !config.block_anonymous {
        return true;
    }

    false
}

/// Maintenance gate bound to the live configuration.
///
/// Cheap to clone; every clone reads the snapshot currently published in
/// the [`ConfigStore`] it was created from.
#[derive(Debug, Clone)]
pub struct AccessGate {
    config: Shared<MaintenanceConfig>,
}

impl AccessGate {
    pub fn new(store: &ConfigStore) -> Self {
        Self {
            config: store.maintenance_handle(),
        }
    }

    /// Check a request against the current maintenance configuration.
    ///
    /// `identity` is `None` when the host attached no identity to the request
    /// at all. With maintenance enabled that is treated as a hard error and
    /// the request is rejected.
    ///
    /// # Errors
    ///
    /// Returns `AppError::MaintenanceActive` when the request must not reach
    /// the next handler.
    pub fn check(&self, identity: Option<&RequestIdentity>) -> Result<(), AppError> {
        // one snapshot per decision
        let config = self.config.load();
        if !config.enabled {
            return Ok(());
        }

        let Some(identity) = identity else {
            tracing::error!("request carries no identity, rejecting during maintenance");
            return Err(AppError::MaintenanceActive);
        };

        if admit(&config, identity) {
            return Ok(());
        }

        // a nameless rejection was already logged by `admit`
        if let Some(principal) = identity.name() {
            tracing::debug!(principal, "blocked request because of maintenance");
        }
        Err(AppError::MaintenanceActive)
    }
}
