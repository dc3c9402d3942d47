//! Error classification logic

use crate::error_class::ErrorClass;
use crate::response::ResponseMeta;
use crate::Error;

const TIMEOUT_MARKERS: &[&str] = &["timeout", "timed out"];
const NETWORK_MARKERS: &[&str] = &["network", "fetch", "connection"];
const AUTH_MARKERS: &[&str] = &["api key", "unauthorized", "authentication"];
const RATE_LIMIT_MARKERS: &[&str] = &["rate", "limit", "quota"];

/// Map a failure plus optional response metadata to its [`ErrorClass`].
///
/// Priority:
/// 1. the response status, when it has an unambiguous mapping
/// 2. the error's own transport signal (`reqwest` timeout/connect, attempt timer)
/// 3. substrings of the lower-cased error text
/// 4. `Unknown`
///
/// Pure: the same inputs always give the same class.
pub fn classify(error: &Error, response: Option<&ResponseMeta>) -> ErrorClass {
    if let Some(class) = response.and_then(class_from_response) {
        return class;
    }

    match error {
        Error::Timeout { .. } => return ErrorClass::Timeout,
        Error::Transport(e) => {
            if let Some(class) = e
                .status()
                .and_then(|s| ErrorClass::from_http_status(s.as_u16()))
            {
                return class;
            }
            if e.is_timeout() {
                return ErrorClass::Timeout;
            }
            if e.is_connect() || e.is_request() {
                return ErrorClass::Network;
            }
            // Builder, decode and redirect failures: only the reqwest text counts.
            return class_from_text(&e.to_string());
        }
        _ => {}
    }

    class_from_text(&error.to_string())
}

/// Classify any displayable failure, for callers that do not use the crate `Error`.
pub fn classify_message(message: &str, response: Option<&ResponseMeta>) -> ErrorClass {
    response
        .and_then(class_from_response)
        .unwrap_or_else(|| class_from_text(message))
}

/// Whether another attempt may fix this class of failure.
#[inline]
pub fn is_retryable(class: ErrorClass) -> bool {
    class.retryable()
}

fn class_from_response(response: &ResponseMeta) -> Option<ErrorClass> {
    response.status.and_then(ErrorClass::from_http_status)
}

fn class_from_text(message: &str) -> ErrorClass {
    let m = message.to_lowercase();
    let has = |markers: &[&str]| markers.iter().any(|k| m.contains(k));

    if has(TIMEOUT_MARKERS) {
        ErrorClass::Timeout
    } else if has(NETWORK_MARKERS) {
        ErrorClass::Network
    } else if has(AUTH_MARKERS) {
        ErrorClass::Auth
    } else if has(RATE_LIMIT_MARKERS) {
        ErrorClass::RateLimit
    } else {
        ErrorClass::Unknown
    }
}
