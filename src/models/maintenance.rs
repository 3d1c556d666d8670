//! Maintenance mode configuration snapshot.

use std::collections::HashSet;

/// Principal allowed through by default while maintenance mode is active.
pub const DEFAULT_ALLOWED_PRINCIPAL: &str = "admin";

/// Configuration of the maintenance gate.
///
/// A snapshot is built once per activation and never mutated afterwards.
/// Reconfiguration publishes a whole new snapshot (see
/// [`ConfigStore`](crate::config::ConfigStore)).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceConfig {
    /// Whether maintenance mode is active
    pub enabled: bool,

    /// Principals admitted while maintenance mode is active
    ///
    /// Matching is exact and case-sensitive. The set may be empty, in which
    /// case only anonymous requests (if not blocked) get through.
    pub allowed_principals: HashSet<String>,

    /// Reject requests of the declared anonymous principal
    pub block_anonymous: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_principals: HashSet::from([DEFAULT_ALLOWED_PRINCIPAL.to_string()]),
            block_anonymous: false,
        }
    }
}

impl MaintenanceConfig {
    /// Active maintenance mode admitting the given principals.
    pub fn enabled_for<I, S>(principals: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            allowed_principals: principals.into_iter().map(Into::into).collect(),
            block_anonymous: false,
        }
    }

    pub fn with_block_anonymous(mut self, block_anonymous: bool) -> Self {
        self.block_anonymous = block_anonymous;
        self
    }

    pub fn allows(&self, principal: &str) -> bool {
        self.allowed_principals.contains(principal)
    }
}
