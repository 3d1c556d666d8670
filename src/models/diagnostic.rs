//! Diagnostic record for slow requests.
//!
//! A record is built right after a slow request finished, handed to the
//! diagnostic sink and dropped. It is never retained.

use std::fmt;

/// Captured body values longer than this many characters are truncated.
pub const MAX_VALUE_CHARS: usize = 100;

/// Everything logged about one slow request.
///
/// # Log Format
///
/// The [`Display`](fmt::Display) implementation renders the single
/// multi-line message written to the log:
///
/// ```text
/// Logging slow request:
/// Duration=5312ms
/// HTTP header
///     POST /content/page HTTP/1.1
///     host = example.com
///     accept = */*
/// Body of POST request
///     title = Hello
/// RequestProgressTracker:
///          0 TIMER_START{Request Processing}
///       5312 TIMER_END{5312,Request Processing}
/// ```
///
/// (lines are indented with a tab)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Measured handling time
    pub duration_millis: u64,

    pub method: String,

    /// Request path, without the query string
    pub uri: String,

    /// Protocol version, e.g. `HTTP/1.1`
    pub protocol: String,

    /// Headers in the order the host enumerated them
    pub headers: Vec<(String, String)>,

    /// Request parameters, only captured for POST requests
    ///
    /// `None` means the body section is omitted from the record entirely.
    pub body_params: Option<Vec<(String, String)>>,

    /// Progress trace lines, copied verbatim
    pub progress_trace: Vec<String>,
}

/// Shorten a captured value to [`MAX_VALUE_CHARS`] characters.
///
/// Longer values keep their first 100 characters followed by
/// `" ... (<original length> characters)"`. Lengths count characters, not
/// bytes, so multi-byte text is never cut in the middle of a code point.
pub fn truncate_value(value: &str) -> String {
    let length = value.chars().count();
    if length <= MAX_VALUE_CHARS {
        return value.to_string();
    }

    let head: String = value.chars().take(MAX_VALUE_CHARS).collect();
    format!("{head} ... ({length} characters)")
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Logging slow request:")?;
        writeln!(f, "Duration={}ms", self.duration_millis)?;
        writeln!(f, "HTTP header")?;
        writeln!(f, "\t{} {} {}", self.method, self.uri, self.protocol)?;
        for (name, value) in &self.headers {
            writeln!(f, "\t{name} = {value}")?;
        }

        if let Some(params) = &self.body_params {
            writeln!(f, "Body of POST request")?;
            for (name, value) in params {
                writeln!(f, "\t{name} = {value}")?;
            }
        }

        writeln!(f, "RequestProgressTracker:")?;
        for line in &self.progress_trace {
            writeln!(f, "\t{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(body_params: Option<Vec<(String, String)>>) -> DiagnosticRecord {
        DiagnosticRecord {
            duration_millis: 6001,
            method: "POST".to_string(),
            uri: "/content/page".to_string(),
            protocol: "HTTP/1.1".to_string(),
            headers: vec![("Host".to_string(), "example.com".to_string())],
            body_params,
            progress_trace: vec!["0 TIMER_START{Request Processing}".to_string()],
        }
    }

    #[test]
    fn short_values_are_verbatim() {
        assert_eq!(truncate_value(""), "");
        assert_eq!(truncate_value("hello"), "hello");

        let exactly = "x".repeat(MAX_VALUE_CHARS);
        assert_eq!(truncate_value(&exactly), exactly);
    }

    #[test]
    fn long_values_are_cut_and_annotated() {
        let value = "a".repeat(150);
        let expected = format!("{} ... (150 characters)", "a".repeat(100));
        assert_eq!(truncate_value(&value), expected);
    }

    #[test]
    fn truncation_counts_characters() {
        let value = "é".repeat(101);
        let truncated = truncate_value(&value);
        assert!(truncated.starts_with(&"é".repeat(100)));
        assert!(truncated.ends_with(" ... (101 characters)"));
    }

    #[test]
    fn renders_all_sections() {
        let rendered = record(Some(vec![("title".to_string(), "Hello".to_string())])).to_string();
        assert_eq!(
            rendered,
            "Logging slow request:\n\
             Duration=6001ms\n\
             HTTP header\n\
             \tPOST /content/page HTTP/1.1\n\
             \tHost = example.com\n\
             Body of POST request\n\
             \ttitle = Hello\n\
             RequestProgressTracker:\n\
             \t0 TIMER_START{Request Processing}\n"
        );
    }

    #[test]
    fn omits_body_section_without_params() {
        let rendered = record(None).to_string();
        assert!(!rendered.contains("Body of POST request"));
        assert!(rendered.contains("RequestProgressTracker:"));
    }
}
