//! Slow request logging middleware.
//!
//! Binds the [`SlowRequestRecorder`] to axum requests. While recording is
//! enabled every request gets a [`ProgressTracker`] in its extensions and a
//! snapshot of its head is kept until the handler finished, so a diagnostic
//! record can be built if the request was slow. POST form bodies are copied
//! while the handler reads them; the middleware never reads a body itself.

use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use futures_util::StreamExt;

use crate::services::{
    progress::ProgressTracker,
    slow_request::{DiagnosticSource, SlowRequestRecorder},
};

/// Slow request middleware function.
///
/// # Flow
///
/// 1. Recording disabled: call the next handler, nothing else
/// 2. Snapshot the request head, tee a POST form body
/// 3. Time the next handler with the recorder
/// 4. Return the handler's response unchanged
///
/// Never fails and never answers on its own: the next handler runs exactly
/// once for every request.
pub async fn slow_request_logger(
    State(recorder): State<SlowRequestRecorder>,
    request: Request,
    next: Next,
) -> Response {
    let config = recorder.config();
    if !config.enabled {
        return next.run(request).await;
    }

    let (mut request, snapshot) = HttpSnapshot::capture(request, config.max_body_bytes);
    request.extensions_mut().insert(snapshot.progress.clone());

    let tracker = snapshot.progress.clone();
    recorder
        .measure(config, &snapshot, async move {
            let response = next.run(request).await;
            tracker.finish();
            response
        })
        .await
}

/// Copy of everything a diagnostic record may need from a request.
#[derive(Debug)]
pub struct HttpSnapshot {
    method: String,
    path: String,
    protocol: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    form: Option<FormCopy>,
    progress: ProgressTracker,
}

impl HttpSnapshot {
    /// Snapshot a request and hand it back ready for the next handler.
    ///
    /// For a POST (any case) with an `application/x-www-form-urlencoded`
    /// body, the body is replaced by a pass-through that copies up to
    /// `max_body_bytes` as the handler consumes it. Chunks and read errors
    /// reach the handler exactly as they would have without the copy.
    /// An existing [`ProgressTracker`] in the extensions is reused.
    pub fn capture(request: Request, max_body_bytes: usize) -> (Request, Self) {
        let (parts, body) = request.into_parts();

        let query = parts.uri.query().map(parse_pairs).unwrap_or_default();

        let (body, form) = if parts.method.as_str().eq_ignore_ascii_case("POST")
            && is_form(&parts.headers)
        {
            let copy = FormCopy::new(max_body_bytes);
            (copy.tee(body), Some(copy))
        } else {
            (body, None)
        };

        let headers = parts
            .headers
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let progress = parts
            .extensions
            .get::<ProgressTracker>()
            .cloned()
            .unwrap_or_else(ProgressTracker::start);

        let snapshot = Self {
            method: parts.method.to_string(),
            path: parts.uri.path().to_string(),
            protocol: format!("{:?}", parts.version),
            headers,
            query,
            form,
            progress,
        };

        (Request::from_parts(parts, body), snapshot)
    }
}

impl DiagnosticSource for HttpSnapshot {
    fn method(&self) -> &str {
        &self.method
    }

    fn uri(&self) -> &str {
        &self.path
    }

    fn protocol(&self) -> &str {
        &self.protocol
    }

    fn headers(&self) -> Vec<(String, Option<String>)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.clone(), Some(value.clone())))
            .collect()
    }

    /// Query pairs, then the pairs of whatever form body the handler read.
    fn parameters(&self) -> Vec<(String, Option<String>)> {
        let form = self.form.as_ref().map(FormCopy::pairs).unwrap_or_default();

        self.query
            .iter()
            .cloned()
            .chain(form)
            .map(|(name, value)| (name, Some(value)))
            .collect()
    }

    fn progress_messages(&self) -> Vec<String> {
        self.progress.messages()
    }
}

/// Bytes of a form body, copied as they stream past.
///
/// Clones share the same buffer. Once the body grows past the limit the copy
/// is dropped and the form is left out of the record.
#[derive(Debug, Clone)]
struct FormCopy {
    buffer: Arc<Mutex<FormBuffer>>,
    max_body_bytes: usize,
}

#[derive(Debug, Default)]
struct FormBuffer {
    bytes: Vec<u8>,
    overflowed: bool,
}

impl FormCopy {
    fn new(max_body_bytes: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(FormBuffer::default())),
            max_body_bytes,
        }
    }

    /// Wrap `body` so every data chunk read from it is also appended here.
    fn tee(&self, body: Body) -> Body {
        let copy = self.clone();
        Body::from_stream(body.into_data_stream().map(move |chunk| {
            if let Ok(bytes) = &chunk {
                copy.append(bytes);
            }
            chunk
        }))
    }

    fn append(&self, chunk: &[u8]) {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if buffer.overflowed {
            return;
        }

        if buffer.bytes.len() + chunk.len() > self.max_body_bytes {
            buffer.overflowed = true;
            buffer.bytes = Vec::new();
            return;
        }

        buffer.bytes.extend_from_slice(chunk);
    }

    fn pairs(&self) -> Vec<(String, String)> {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        if buffer.overflowed {
            tracing::debug!(
                max_body_bytes = self.max_body_bytes,
                "form body exceeded the capture limit, leaving it out"
            );
            return Vec::new();
        }

        parse_pairs(&buffer.bytes)
    }
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("application/x-www-form-urlencoded")
        })
}

fn parse_pairs(input: impl AsRef<[u8]>) -> Vec<(String, String)> {
    url::form_urlencoded::parse(input.as_ref())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}
