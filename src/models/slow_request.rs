//! Slow request configuration snapshot.

/// Threshold used when none is configured, in milliseconds.
pub const DEFAULT_THRESHOLD_MILLIS: u64 = 5000;

/// Largest form body copied for capture, in bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 64 * 1024;

/// Configuration of the slow request recorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlowRequestConfig {
    /// Whether requests are timed at all
    ///
    /// When disabled the recorder adds no overhead: no clock reads and no
    /// allocations.
    pub enabled: bool,

    /// Requests taking strictly longer than this are recorded
    pub threshold_millis: u64,

    /// Cap on the copy of a form body kept for capture, in bytes
    ///
    /// The form pairs of a larger body are left out of the record; query
    /// parameters are still captured.
    pub max_body_bytes: usize,
}

impl Default for SlowRequestConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold_millis: DEFAULT_THRESHOLD_MILLIS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl SlowRequestConfig {
    pub fn enabled(threshold_millis: u64) -> Self {
        Self {
            enabled: true,
            threshold_millis,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    /// Whether a request that took `duration_millis` must be recorded.
    pub fn is_slow(&self, duration_millis: u64) -> bool {
        self.enabled && duration_millis > self.threshold_millis
    }
}
