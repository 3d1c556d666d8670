//! Per-request progress tracker.
//!
//! Handlers running behind the slow request recorder can note what they
//! are doing on the tracker found in the request extensions. When the
//! request turns out to be slow, the collected lines end up in the
//! diagnostic record.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

const TIMER_NAME: &str = "Request Processing";

/// Ordered trace of timestamped progress messages.
///
/// Every line is prefixed with the milliseconds elapsed since the tracker
/// was started. Clones share the same trace.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    started: Instant,
    messages: Mutex<Vec<String>>,
}

impl ProgressTracker {
    /// Start a tracker; the first line records the timer start.
    pub fn start() -> Self {
        let tracker = Self {
            inner: Arc::new(Inner {
                started: Instant::now(),
                messages: Mutex::new(Vec::new()),
            }),
        };
        tracker.log(format!("TIMER_START{{{TIMER_NAME}}}"));
        tracker
    }

    pub fn elapsed_millis(&self) -> u64 {
        u64::try_from(self.inner.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Append a message to the trace.
    pub fn log(&self, message: impl AsRef<str>) {
        let line = format!("{:>6} {}", self.elapsed_millis(), message.as_ref());
        self.inner
            .messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    /// Record the end of request processing.
    pub fn finish(&self) {
        let elapsed = self.elapsed_millis();
        self.log(format!("TIMER_END{{{elapsed},{TIMER_NAME}}}"));
    }

    /// Copy of all lines logged so far, oldest first.
    pub fn messages(&self) -> Vec<String> {
        self.inner
            .messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
