use crate::error_class::ErrorClass;
use crate::response::ResponseMeta;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "retry.max_delay_ms")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "config_loader", "batch_scheduler")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the orchestrator.
/// This aggregates all low-level errors into actionable, high-level categories
#[derive(Debug, Error)]
pub enum Error {
    /// A remote call failed and the provider handed back response metadata.
    #[error("{message}")]
    Remote {
        message: String,
        response: ResponseMeta,
    },

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// Batch-level stop requested through a `CancellationToken`.
    #[error("Batch cancelled after {completed_windows} window(s) of {total_items} item(s)")]
    Cancelled {
        completed_windows: usize,
        total_items: usize,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// A failed remote call carrying its HTTP status and headers.
    pub fn remote(msg: impl Into<String>, response: ResponseMeta) -> Self {
        Error::Remote {
            message: msg.into(),
            response,
        }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::runtime_with_context(msg, ErrorContext::new())
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Response metadata attached by the provider, if any.
    pub fn response(&self) -> Option<&ResponseMeta> {
        match self {
            Error::Remote { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Taxonomy bucket for this error (see [`crate::classify::classify`]).
    pub fn classification(&self) -> ErrorClass {
        crate::classify::classify(self, self.response())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_is_rendered_in_display() {
        let err = Error::configuration_with_context(
            "concurrency must be at least 1",
            ErrorContext::new()
                .with_field_path("batch.concurrency")
                .with_source("config"),
        );
        assert_eq!(
            err.to_string(),
            "Configuration error: concurrency must be at least 1 (field: batch.concurrency, source: config)"
        );
        assert!(err.context().is_some());
    }

    #[test]
    fn test_remote_error_keeps_message_verbatim() {
        let err = Error::remote("invalid_api_key: key revoked", ResponseMeta::with_status(401));
        assert_eq!(err.to_string(), "invalid_api_key: key revoked");
        assert_eq!(err.response().and_then(|r| r.status), Some(401));
        assert_eq!(err.classification(), ErrorClass::Auth);
    }

    #[test]
    fn test_cancelled_is_distinct() {
        let err = Error::Cancelled {
            completed_windows: 1,
            total_items: 9,
        };
        assert!(err.is_cancelled());
        assert!(!Error::runtime("boom").is_cancelled());
    }
}
