//! Response metadata attached to failed remote calls.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Status and headers of a failed response, as far as the provider saw them.
///
/// Providers attach this to [`crate::Error::Remote`] so classification and backoff can
/// look at the HTTP status and server hints without knowing the wire format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseMeta {
    pub status: Option<u16>,
    pub headers: HeaderMap,
}

impl ResponseMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            headers: HeaderMap::new(),
        }
    }

    /// Capture status and headers from a live `reqwest` response.
    pub fn from_response(resp: &reqwest::Response) -> Self {
        Self {
            status: Some(resp.status().as_u16()),
            headers: resp.headers().clone(),
        }
    }

    /// Add a header. Names or values that are not valid HTTP are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(n), Ok(v)) = (HeaderName::try_from(name), HeaderValue::from_str(value)) {
            self.headers.insert(n, v);
        }
        self
    }

    /// Extract the first matching header value from a list of header names.
    pub fn header_first(&self, names: &[&str]) -> Option<String> {
        for name in names {
            if let Some(v) = self.headers.get(*name) {
                if let Ok(s) = v.to_str() {
                    let s = s.trim();
                    if !s.is_empty() {
                        return Some(s.to_string());
                    }
                }
            }
        }
        None
    }

    /// Server-provided wait before the next attempt.
    ///
    /// Supports `retry-after-ms` (milliseconds) and `retry-after` as seconds
    /// (integer or fractional) or an HTTP date. Dates in the past yield zero.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_at(Utc::now())
    }

    pub(crate) fn retry_after_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        if let Some(raw) = self.header_first(&["retry-after-ms"]) {
            if let Some(d) = parse_non_negative(&raw).and_then(|ms| secs_to_duration(ms / 1000.0)) {
                return Some(d);
            }
        }

        let raw = self.header_first(&["retry-after"])?;
        if let Some(secs) = parse_non_negative(&raw) {
            return secs_to_duration(secs);
        }

        let at = DateTime::parse_from_rfc2822(&raw).ok()?;
        let offset_ms = at
            .with_timezone(&Utc)
            .signed_duration_since(now)
            .num_milliseconds()
            .max(0);
        Some(Duration::from_millis(offset_ms as u64))
    }
}

fn parse_non_negative(raw: &str) -> Option<f64> {
    let v: f64 = raw.parse().ok()?;
    if v.is_finite() {
        Some(v.max(0.0))
    } else {
        None
    }
}

/// Out-of-range values count as no hint.
fn secs_to_duration(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}
