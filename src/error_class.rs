//! 错误分类码：定义 7 个错误类别及其重试语义。
//!
//! Error taxonomy for remote call failures.
//!
//! Every failed attempt lands in exactly one bucket. The bucket alone decides whether the
//! resilient invoker may try again.
//!
//! | Class        | Retryable | Typical source                        |
//! |--------------|-----------|---------------------------------------|
//! | `Auth`       | no        | HTTP 401/403, bad or missing API key  |
//! | `RateLimit`  | yes       | HTTP 429, quota messages              |
//! | `Network`    | yes       | connection resets, DNS, fetch errors  |
//! | `Server`     | yes       | HTTP 5xx                              |
//! | `Validation` | no        | HTTP 400, malformed payloads          |
//! | `Timeout`    | yes       | attempt timer expiry                  |
//! | `Unknown`    | no        | anything unclassified                 |
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_orchestrator::error_class::ErrorClass;
//!
//! let class = ErrorClass::from_http_status(429).unwrap();
//! assert_eq!(class.name(), "rate_limit");
//! assert!(class.retryable());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Invalid, expired, or missing credentials
    Auth,
    /// Request rate or quota exceeded
    RateLimit,
    /// Connection-level failure before a response arrived
    Network,
    /// Provider-side internal failure
    Server,
    /// Malformed request or invalid parameters
    Validation,
    /// Attempt timer expired before the call completed
    Timeout,
    /// Error could not be classified
    Unknown,
}

impl ErrorClass {
    pub const ALL: [ErrorClass; 7] = [
        Self::Auth,
        Self::RateLimit,
        Self::Network,
        Self::Server,
        Self::Validation,
        Self::Timeout,
        Self::Unknown,
    ];

    /// Returns the standard name (e.g., `"rate_limit"`).
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::RateLimit => "rate_limit",
            Self::Network => "network",
            Self::Server => "server",
            Self::Validation => "validation",
            Self::Timeout => "timeout",
            Self::Unknown => "unknown",
        }
    }

    /// Returns whether another attempt in the same session may succeed.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit | Self::Network | Self::Server | Self::Timeout
        )
    }

    /// Short remedy shown next to a terminal failure.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::Auth => "check the API key and its permissions",
            Self::RateLimit => "reduce request rate or wait for the quota to reset",
            Self::Network => "check network connectivity",
            Self::Server => "the provider is failing, try again later",
            Self::Validation => "the request was rejected as invalid, fix the input",
            Self::Timeout => "the provider did not answer in time, raise the timeout",
            Self::Unknown => "see the error message for details",
        }
    }

    /// Maps an HTTP status code to its class.
    ///
    /// Only the statuses with an unambiguous meaning are mapped; anything else
    /// returns `None` so the caller can fall back to message inspection.
    pub fn from_http_status(status: u16) -> Option<Self> {
        match status {
            401 | 403 => Some(Self::Auth),
            429 => Some(Self::RateLimit),
            400 => Some(Self::Validation),
            500..=599 => Some(Self::Server),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
