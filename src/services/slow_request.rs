//! Slow request recorder.
//!
//! Times the next handler and, when it took longer than the configured
//! threshold, logs a [`DiagnosticRecord`] with the request headers, the POST
//! parameters and the progress trace. The recorder never blocks or alters a
//! request; it only observes.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use crate::config::{ConfigStore, Shared};
use crate::error::CaptureError;
use crate::models::diagnostic::{DiagnosticRecord, truncate_value};
use crate::models::slow_request::SlowRequestConfig;

/// Log target of diagnostic records.
///
/// Route it to a dedicated file (or filter it) so the regular log is not
/// flooded, e.g. `RUST_LOG=info,request_filters::slow_requests=info`.
pub const SLOW_REQUEST_TARGET: &str = "request_filters::slow_requests";

/// Source of the current time.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Host view of a request, as needed for diagnostic capture.
///
/// Entries are returned in the order the host enumerates them. A `None`
/// value marks an entry the host listed but could not read; capture fails
/// on it.
pub trait DiagnosticSource {
    fn method(&self) -> &str;

    /// Request path, without the query string
    fn uri(&self) -> &str;

    fn protocol(&self) -> &str;

    fn headers(&self) -> Vec<(String, Option<String>)>;

    /// Request parameters (query string and form body)
    fn parameters(&self) -> Vec<(String, Option<String>)>;

    fn progress_messages(&self) -> Vec<String>;
}

/// Destination of diagnostic records.
pub trait DiagnosticSink: Send + Sync + 'static {
    /// Write the record. Must not block the response path.
    fn emit(&self, record: &DiagnosticRecord);
}

/// Writes records to the `tracing` log as one multi-line info event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, record: &DiagnosticRecord) {
        tracing::info!(
            target: SLOW_REQUEST_TARGET,
            duration_ms = record.duration_millis,
            method = %record.method,
            uri = %record.uri,
            "{record}"
        );
    }
}

/// Build the diagnostic record of a request that took `duration_millis`.
///
/// # Capture Rules
///
/// - Headers and progress trace keep the host's order, duplicates included
/// - Parameters are only captured when the method is `POST` (any case);
///   otherwise the body section is left out and parameters are not read
/// - Parameter values longer than 100 characters are truncated
///
/// # Errors
///
/// Returns a [`CaptureError`] when a header or captured parameter has no
/// readable value.
pub fn capture<S>(source: &S, duration_millis: u64) -> Result<DiagnosticRecord, CaptureError>
where
    S: DiagnosticSource + ?Sized,
{
    let headers = source
        .headers()
        .into_iter()
        .map(|(name, value)| match value {
            Some(value) => Ok((name, value)),
            None => Err(CaptureError::UnreadableHeader(name)),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let body_params = if source.method().eq_ignore_ascii_case("POST") {
        let params = source
            .parameters()
            .into_iter()
            .map(|(name, value)| match value {
                Some(value) => Ok((name, truncate_value(&value))),
                None => Err(CaptureError::UnreadableParameter(name)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Some(params)
    } else {
        None
    };

    Ok(DiagnosticRecord {
        duration_millis,
        method: source.method().to_string(),
        uri: source.uri().to_string(),
        protocol: source.protocol().to_string(),
        headers,
        body_params,
        progress_trace: source.progress_messages(),
    })
}

/// Slow request recorder bound to the live configuration.
///
/// Cheap to clone; clones share clock, sink and configuration.
#[derive(Clone)]
pub struct SlowRequestRecorder {
    config: Shared<SlowRequestConfig>,
    clock: Arc<dyn Clock>,
    sink: Arc<dyn DiagnosticSink>,
}

impl SlowRequestRecorder {
    /// Recorder timing with the system clock and logging through `tracing`.
    pub fn new(store: &ConfigStore) -> Self {
        Self {
            config: store.slow_requests_handle(),
            clock: Arc::new(SystemClock),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_sink(mut self, sink: impl DiagnosticSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> SlowRequestConfig {
        **self.config.load()
    }

    /// Run `next`, recording the request described by `source` if it is slow.
    ///
    /// `next` is awaited exactly once and its output is returned unchanged.
    /// When recording is disabled nothing else happens: no clock reads and
    /// no allocations.
    pub async fn wrap<S, Fut>(&self, source: S, next: Fut) -> Fut::Output
    where
        S: DiagnosticSource,
        Fut: Future,
    {
        let config = self.config();
        if !config.enabled {
            return next.await;
        }

        self.measure(config, &source, next).await
    }

    /// Time `next` against an already loaded, enabled configuration.
    pub(crate) async fn measure<S, Fut>(
        &self,
        config: SlowRequestConfig,
        source: &S,
        next: Fut,
    ) -> Fut::Output
    where
        S: DiagnosticSource + ?Sized,
        Fut: Future,
    {
        let started = self.clock.now();
        let output = next.await;
        let finished = self.clock.now();

        // a clock running backwards yields zero, not an error
        let duration = finished.saturating_duration_since(started);
        let duration_millis = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);

        if config.is_slow(duration_millis) {
            self.report(source, duration_millis);
        }

        output
    }

    fn report<S>(&self, source: &S, duration_millis: u64)
    where
        S: DiagnosticSource + ?Sized,
    {
        match capture(source, duration_millis) {
            Ok(record) => self.sink.emit(&record),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    duration_ms = duration_millis,
                    method = source.method(),
                    uri = source.uri(),
                    "failed to capture slow request"
                );
            }
        }
    }
}

impl std::fmt::Debug for SlowRequestRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlowRequestRecorder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::services::log_capture::logs_of;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Advances by a fixed step on every read.
    struct StepClock {
        base: Instant,
        step_millis: u64,
        reads: Arc<AtomicUsize>,
    }

    impl StepClock {
        fn new(step_millis: u64) -> (Self, Arc<AtomicUsize>) {
            let reads = Arc::new(AtomicUsize::new(0));
            let clock = Self {
                base: Instant::now(),
                step_millis,
                reads: Arc::clone(&reads),
            };
            (clock, reads)
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> Instant {
            let n = self.reads.fetch_add(1, Ordering::SeqCst) as u64;
            self.base + Duration::from_millis(n * self.step_millis)
        }
    }

    #[derive(Clone, Default)]
    struct CollectingSink {
        records: Arc<Mutex<Vec<DiagnosticRecord>>>,
    }

    impl CollectingSink {
        fn records(&self) -> Vec<DiagnosticRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl DiagnosticSink for CollectingSink {
        fn emit(&self, record: &DiagnosticRecord) {
            self.records.lock().unwrap().push(record.clone());
        }
    }

    struct FakeRequest {
        method: &'static str,
        parameters: Vec<(String, Option<String>)>,
        parameter_reads: Arc<AtomicU64>,
    }

    impl FakeRequest {
        fn new(method: &'static str) -> Self {
            Self {
                method,
                parameters: vec![("title".to_string(), Some("Hello".to_string()))],
                parameter_reads: Arc::new(AtomicU64::new(0)),
            }
        }
    }

    impl DiagnosticSource for FakeRequest {
        fn method(&self) -> &str {
            self.method
        }

        fn uri(&self) -> &str {
            "/content/page"
        }

        fn protocol(&self) -> &str {
            "HTTP/1.1"
        }

        fn headers(&self) -> Vec<(String, Option<String>)> {
            ["Host", "Accept", "X-Custom"]
                .into_iter()
                .map(|name| (name.to_string(), Some(format!("{name}-value"))))
                .collect()
        }

        fn parameters(&self) -> Vec<(String, Option<String>)> {
            self.parameter_reads.fetch_add(1, Ordering::SeqCst);
            self.parameters.clone()
        }

        fn progress_messages(&self) -> Vec<String> {
            vec!["0 first".to_string(), "3 second".to_string()]
        }
    }

    fn recorder(
        config: SlowRequestConfig,
        step_millis: u64,
    ) -> (SlowRequestRecorder, CollectingSink, Arc<AtomicUsize>) {
        let store = ConfigStore::new(&Settings {
            slow_requests: config,
            ..Settings::default()
        });
        let (clock, reads) = StepClock::new(step_millis);
        let sink = CollectingSink::default();
        let recorder = SlowRequestRecorder::new(&store)
            .with_clock(clock)
            .with_sink(sink.clone());
        (recorder, sink, reads)
    }

    #[tokio::test]
    async fn disabled_never_reads_the_clock() {
        let (recorder, sink, reads) = recorder(SlowRequestConfig::default(), 10_000);

        let output = recorder.wrap(FakeRequest::new("POST"), async { 42 }).await;

        assert_eq!(output, 42);
        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn boundary_duration_is_not_slow() {
        let (recorder, sink, reads) = recorder(SlowRequestConfig::enabled(100), 100);

        let output = recorder.wrap(FakeRequest::new("GET"), async { "ok" }).await;

        assert_eq!(output, "ok");
        assert_eq!(reads.load(Ordering::SeqCst), 2);
        assert!(sink.records().is_empty());
    }

    #[tokio::test]
    async fn records_request_over_threshold() {
        let (recorder, sink, _) = recorder(SlowRequestConfig::enabled(100), 101);

        recorder.wrap(FakeRequest::new("GET"), async {}).await;

        let records = sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.duration_millis, 101);
        assert_eq!(record.method, "GET");
        assert_eq!(record.uri, "/content/page");
        assert_eq!(record.protocol, "HTTP/1.1");
        let names: Vec<&str> = record.headers.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["Host", "Accept", "X-Custom"]);
        assert_eq!(record.progress_trace, ["0 first", "3 second"]);
        assert_eq!(record.body_params, None);
    }

    #[tokio::test]
    async fn get_parameters_are_never_read() {
        let (recorder, sink, _) = recorder(SlowRequestConfig::enabled(0), 5);
        let request = FakeRequest::new("GET");
        let reads = Arc::clone(&request.parameter_reads);

        recorder.wrap(request, async {}).await;

        assert_eq!(reads.load(Ordering::SeqCst), 0);
        assert_eq!(sink.records()[0].body_params, None);
    }

    #[tokio::test]
    async fn post_parameters_are_captured_case_insensitively() {
        let (recorder, sink, _) = recorder(SlowRequestConfig::enabled(0), 5);
        let mut request = FakeRequest::new("post");
        request
            .parameters
            .push(("text".to_string(), Some("b".repeat(120))));

        recorder.wrap(request, async {}).await;

        let params = sink.records()[0].body_params.clone().expect("POST body");
        assert_eq!(params[0], ("title".to_string(), "Hello".to_string()));
        assert_eq!(
            params[1].1,
            format!("{} ... (120 characters)", "b".repeat(100))
        );
    }

    #[tokio::test]
    async fn capture_failure_keeps_the_response() {
        let (recorder, sink, _) = recorder(SlowRequestConfig::enabled(0), 5);
        let mut request = FakeRequest::new("POST");
        request.parameters.push(("broken".to_string(), None));

        let output = recorder.wrap(request, async { vec![1, 2, 3] }).await;

        assert_eq!(output, vec![1, 2, 3]);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn tracing_sink_writes_one_multi_line_info_event() {
        let record = capture(&FakeRequest::new("GET"), 7).unwrap();

        let logs = logs_of(|| TracingSink.emit(&record));

        assert_eq!(logs.matches(" INFO ").count(), 1, "{logs}");
        assert!(logs.contains(&format!(" INFO {SLOW_REQUEST_TARGET}: ")));
        assert!(logs.contains("Logging slow request:\nDuration=7ms\nHTTP header\n\tGET /content/page HTTP/1.1\n"));
        assert!(logs.contains("\tHost = Host-value\n\tAccept = Accept-value\n"));
        assert!(logs.contains("RequestProgressTracker:\n\t0 first\n\t3 second\n"));
        assert!(logs.contains("duration_ms=7"));
    }

    #[test]
    fn capture_reports_unreadable_parameter() {
        let mut request = FakeRequest::new("POST");
        request.parameters.push(("broken".to_string(), None));

        let err = capture(&request, 10).unwrap_err();
        assert!(matches!(err, CaptureError::UnreadableParameter(name) if name == "broken"));
    }
}
