//! Orchestrator configuration
//!
//! Loaded from YAML or JSON, then optionally overridden from the environment:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `AI_LIB_BATCH_CONCURRENCY` | `batch.concurrency` |
//! | `AI_LIB_MAX_RETRIES` | `retry.max_retries` |
//! | `AI_LIB_BASE_DELAY_MS` | `retry.base_delay_ms` |
//! | `AI_LIB_MAX_DELAY_MS` | `retry.max_delay_ms` |
//! | `AI_LIB_TIMEOUT_MS` | `retry.timeout_ms` |

use crate::batch::BatchScheduler;
use crate::resilience::{BackoffPolicy, InvokeOptions, ResilientInvoker};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub batch: BatchSettings,
    pub retry: RetrySettings,
    pub backoff: BackoffSettings,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pricing: Vec<PricingEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub concurrency: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            concurrency: crate::batch::DEFAULT_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Per-attempt timeout.
    pub timeout_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffSettings {
    /// Upper bound of the random jitter, as a fraction of the exponential delay.
    pub jitter_ratio: f64,
    /// Base delay multiplier for rate limits that came without a `Retry-After` hint.
    pub no_hint_multiplier: u32,
}

impl Default for BackoffSettings {
    fn default() -> Self {
        Self {
            jitter_ratio: 0.3,
            no_hint_multiplier: 2,
        }
    }
}

/// Price override or addition for one provider/model pair, per 1K units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingEntry {
    pub provider: String,
    pub model: String,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
}

impl OrchestratorConfig {
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json_str(&raw)
        } else {
            Self::from_yaml_str(&raw)
        }
    }

    /// File + environment overrides + validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let cfg = Self::from_path(path)?.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup. Unparsable values, and zero for concurrency or
    /// timeout, are ignored.
    pub fn apply_overrides_from<L>(mut self, lookup: L) -> Self
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var::<usize, _>(&lookup, "AI_LIB_BATCH_CONCURRENCY").filter(|v| *v > 0) {
            self.batch.concurrency = v;
        }
        if let Some(v) = parse_var(&lookup, "AI_LIB_MAX_RETRIES") {
            self.retry.max_retries = v;
        }
        if let Some(v) = parse_var(&lookup, "AI_LIB_BASE_DELAY_MS") {
            self.retry.base_delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "AI_LIB_MAX_DELAY_MS") {
            self.retry.max_delay_ms = v;
        }
        if let Some(v) = parse_var::<u64, _>(&lookup, "AI_LIB_TIMEOUT_MS").filter(|v| *v > 0) {
            self.retry.timeout_ms = v;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.concurrency == 0 {
            return Err(invalid(
                "batch.concurrency",
                "concurrency must be at least 1",
                "got 0",
            ));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(invalid(
                "retry.base_delay_ms",
                "base delay exceeds max delay",
                format!(
                    "base {} ms, max {} ms",
                    self.retry.base_delay_ms, self.retry.max_delay_ms
                ),
            ));
        }
        if self.retry.timeout_ms == 0 {
            return Err(invalid("retry.timeout_ms", "timeout must be positive", "got 0"));
        }
        if !(0.0..=1.0).contains(&self.backoff.jitter_ratio) {
            return Err(invalid(
                "backoff.jitter_ratio",
                "jitter ratio outside [0, 1]",
                format!("got {}", self.backoff.jitter_ratio),
            ));
        }
        for (i, p) in self.pricing.iter().enumerate() {
            if !(p.input_cost_per_1k >= 0.0 && p.output_cost_per_1k >= 0.0) {
                return Err(invalid(
                    format!("pricing[{}]", i),
                    "prices must be non-negative",
                    format!(
                        "{}/{}: input {}, output {}",
                        p.provider, p.model, p.input_cost_per_1k, p.output_cost_per_1k
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn invoker(&self) -> ResilientInvoker {
        ResilientInvoker::new(InvokeOptions::from(&self.retry))
            .with_backoff(BackoffPolicy::from(&self.backoff))
    }

    pub fn scheduler(&self) -> BatchScheduler {
        BatchScheduler::from_config(self)
    }
}

fn parse_var<T, L>(lookup: &L, key: &str) -> Option<T>
where
    T: FromStr,
    L: Fn(&str) -> Option<String>,
{
    lookup(key).and_then(|s| s.trim().parse::<T>().ok())
}

fn invalid(field: impl Into<String>, msg: &str, details: impl Into<String>) -> Error {
    Error::configuration_with_context(
        msg,
        ErrorContext::new()
            .with_field_path(field)
            .with_details(details)
            .with_source("orchestrator_config"),
    )
}
