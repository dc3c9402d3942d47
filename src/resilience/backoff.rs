//! Exponential backoff with jitter.

use crate::config::BackoffSettings;
use crate::error_class::ErrorClass;
use rand::Rng;
use std::time::Duration;

/// Computes the sleep between two attempts.
///
/// `delay = min(base * 2^attempt * (1 + U(0, jitter_ratio)), max)`
///
/// Rate-limit failures follow the server's `Retry-After` hint when present, otherwise the
/// schedule restarts from `base * no_hint_multiplier`.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub jitter_ratio: f64,
    pub no_hint_multiplier: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            jitter_ratio: 0.3,
            no_hint_multiplier: 2,
        }
    }
}

impl BackoffPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministic schedule, mostly useful for tests and replays.
    pub fn without_jitter() -> Self {
        Self {
            jitter_ratio: 0.0,
            ..Self::default()
        }
    }

    /// Clamped to `[0, 1]`; NaN disables jitter.
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = clamp_ratio(ratio);
        self
    }

    pub fn with_no_hint_multiplier(mut self, m: u32) -> Self {
        self.no_hint_multiplier = m;
        self
    }

    /// Delay after the 0-based `attempt` failed. Never exceeds `max`.
    pub fn delay(&self, attempt: u32, base: Duration, max: Duration) -> Duration {
        if base.is_zero() {
            return Duration::ZERO;
        }
        let cap_ms = max.as_millis() as f64;
        // powi saturates to inf for huge attempts; min() below clamps it.
        let exp_ms = base.as_millis() as f64 * 2f64.powi(attempt.min(i32::MAX as u32) as i32);

        let ratio = clamp_ratio(self.jitter_ratio);
        let jitter_ms = if ratio > 0.0 && exp_ms.is_finite() {
            exp_ms * rand::thread_rng().gen_range(0.0..ratio)
        } else {
            0.0
        };

        let ms = (exp_ms + jitter_ms).min(cap_ms);
        Duration::from_millis(ms as u64)
    }

    /// Delay for a failure of the given class, honouring a server hint for rate limits.
    pub fn delay_for(
        &self,
        attempt: u32,
        class: ErrorClass,
        retry_after: Option<Duration>,
        base: Duration,
        max: Duration,
    ) -> Duration {
        if class != ErrorClass::RateLimit {
            return self.delay(attempt, base, max);
        }
        match retry_after {
            Some(hint) => hint,
            None => self.delay(
                attempt,
                base.saturating_mul(self.no_hint_multiplier.max(1)),
                max,
            ),
        }
    }
}

impl From<&BackoffSettings> for BackoffPolicy {
    fn from(s: &BackoffSettings) -> Self {
        Self {
            jitter_ratio: clamp_ratio(s.jitter_ratio),
            no_hint_multiplier: s.no_hint_multiplier,
        }
    }
}

fn clamp_ratio(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}
