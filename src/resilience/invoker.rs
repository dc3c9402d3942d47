//! 弹性调用器：超时、分类驱动的重试与退避。
//!
//! Resilient invocation of a single remote call.
//!
//! One invocation walks a small state machine:
//!
//! ```text
//! Attempting -> Success -> Done
//!            -> Failure -> Classify -> retryable && attempts remain -> Sleep -> Attempting
//!                                   -> terminal || exhausted        -> Failed
//! ```
//!
//! Each attempt gets a fresh timeout window. Expiry drops the in-flight future and counts
//! as a `Timeout` failure. On the terminal path the last error is returned as-is.

use crate::config::RetrySettings;
use crate::error_class::ErrorClass;
use crate::resilience::backoff::BackoffPolicy;
use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOptions {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Per-attempt budget. `None` lets an attempt run until it resolves.
    pub timeout: Option<Duration>,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            timeout: Some(Duration::from_millis(30_000)),
        }
    }
}

impl InvokeOptions {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }
    pub fn with_base_delay(mut self, d: Duration) -> Self {
        self.base_delay = d;
        self
    }
    pub fn with_max_delay(mut self, d: Duration) -> Self {
        self.max_delay = d;
        self
    }
    pub fn with_timeout(mut self, t: Option<Duration>) -> Self {
        self.timeout = t;
        self
    }
}

impl From<&RetrySettings> for InvokeOptions {
    fn from(s: &RetrySettings) -> Self {
        Self {
            max_retries: s.max_retries,
            base_delay: Duration::from_millis(s.base_delay_ms),
            max_delay: Duration::from_millis(s.max_delay_ms),
            timeout: Some(Duration::from_millis(s.timeout_ms)),
        }
    }
}

/// Mutable bookkeeping for one invocation; dropped when the call ends.
#[derive(Debug, Clone)]
pub struct RetryState {
    /// Attempts started so far (1 after the first attempt).
    pub attempt: u32,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryState {
    fn new(options: &InvokeOptions) -> Self {
        Self {
            attempt: 0,
            max_retries: options.max_retries,
            base_delay: options.base_delay,
            max_delay: options.max_delay,
        }
    }

    fn attempts_remain(&self) -> bool {
        self.attempt <= self.max_retries
    }
}

/// Per-call figures reported by [`ResilientInvoker::invoke_with_stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvokeStats {
    pub attempts: u32,
    pub retries: u32,
    pub total_backoff: Duration,
}

/// Internal decision for how to proceed after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Retry { delay: Duration },
    Fail,
}

/// Wraps a remote call with timeout, retry and backoff.
#[derive(Debug, Clone, Default)]
pub struct ResilientInvoker {
    options: InvokeOptions,
    backoff: BackoffPolicy,
}

impl ResilientInvoker {
    pub fn new(options: InvokeOptions) -> Self {
        Self {
            options,
            backoff: BackoffPolicy::default(),
        }
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn options(&self) -> &InvokeOptions {
        &self.options
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Run `call` until it succeeds, fails terminally, or runs out of retries.
    pub async fn invoke<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        Ok(self.invoke_with_stats(call).await?.0)
    }

    /// Like [`invoke`](Self::invoke), also reporting attempts and time spent backing off.
    pub async fn invoke_with_stats<T, F, Fut>(&self, mut call: F) -> Result<(T, InvokeStats)>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut state = RetryState::new(&self.options);
        let mut stats = InvokeStats::default();

        loop {
            state.attempt += 1;
            stats.attempts = state.attempt;

            let err = match self.attempt_once(&mut call).await {
                Ok(value) => {
                    if stats.retries > 0 {
                        debug!(attempts = stats.attempts, "call succeeded after retries");
                    }
                    return Ok((value, stats));
                }
                Err(e) => e,
            };

            let class = err.classification();
            match self.decide(&state, class, &err) {
                Decision::Retry { delay } => {
                    warn!(
                        attempt = state.attempt,
                        max_retries = state.max_retries,
                        class = class.name(),
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying failed call"
                    );
                    stats.retries += 1;
                    stats.total_backoff += delay;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                Decision::Fail => {
                    debug!(
                        attempt = state.attempt,
                        class = class.name(),
                        retryable = class.retryable(),
                        "giving up on call"
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn attempt_once<T, F, Fut>(&self, call: &mut F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let fut = call();
        match self.options.timeout {
            Some(t) => match tokio::time::timeout(t, fut).await {
                Ok(r) => r,
                Err(_) => Err(Error::Timeout {
                    timeout_ms: t.as_millis() as u64,
                }),
            },
            None => fut.await,
        }
    }

    fn decide(&self, state: &RetryState, class: ErrorClass, err: &Error) -> Decision {
        if !class.retryable() || !state.attempts_remain() {
            return Decision::Fail;
        }
        let retry_after = err.response().and_then(|r| r.retry_after());
        Decision::Retry {
            delay: self.backoff.delay_for(
                state.attempt - 1,
                class,
                retry_after,
                state.base_delay,
                state.max_delay,
            ),
        }
    }
}

/// One-shot form of [`ResilientInvoker::invoke`] with the default backoff policy.
pub async fn invoke<T, F, Fut>(call: F, options: InvokeOptions) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    ResilientInvoker::new(options).invoke(call).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseMeta;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::time::Instant;

    fn rate_limited() -> Error {
        Error::remote("429 too many requests", ResponseMeta::with_status(429))
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_rate_limits() {
        let calls = Arc::new(AtomicU32::new(0));
        let invoker = ResilientInvoker::new(InvokeOptions::new().with_max_retries(2))
            .with_backoff(BackoffPolicy::without_jitter());

        let c = calls.clone();
        let (value, stats) = invoker
            .invoke_with_stats(move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(rate_limited())
                    } else {
                        Ok(format!("attempt-{}", n + 1))
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, "attempt-3");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(stats.attempts, 3);
        assert_eq!(stats.retries, 2);
        // no hint: base doubles to 2s, then 2s * 2^1
        assert_eq!(stats.total_backoff, Duration::from_millis(2000 + 4000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_fails_fast_without_sleeping() {
        let calls = Arc::new(AtomicU32::new(0));
        let invoker = ResilientInvoker::new(InvokeOptions::new().with_max_retries(1));
        let start = Instant::now();

        let c = calls.clone();
        let err = invoker
            .invoke(move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::remote("bad key", ResponseMeta::with_status(401)))
                }
            })
            .await
            .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(err.classification(), ErrorClass::Auth);
        assert_eq!(err.to_string(), "bad key");
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error_unchanged() {
        let calls = Arc::new(AtomicU32::new(0));
        let invoker = ResilientInvoker::new(InvokeOptions::new().with_max_retries(2))
            .with_backoff(BackoffPolicy::without_jitter());

        let c = calls.clone();
        let err = invoker
            .invoke(move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::remote(
                        format!("server melted #{}", n),
                        ResponseMeta::with_status(502),
                    ))
                }
            })
            .await
            .unwrap_err();

        // attempts never exceed max_retries + 1
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.to_string(), "server melted #2");
        assert_eq!(err.classification(), ErrorClass::Server);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_retryable_and_fresh_per_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let options = InvokeOptions::new()
            .with_max_retries(1)
            .with_base_delay(Duration::from_millis(10))
            .with_timeout(Some(Duration::from_millis(100)));
        let invoker = ResilientInvoker::new(options).with_backoff(BackoffPolicy::without_jitter());

        let c = calls.clone();
        let (value, stats) = invoker
            .invoke_with_stats(move || {
                let c = c.clone();
                async move {
                    let n = c.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    } else {
                        tokio::time::sleep(Duration::from_millis(90)).await;
                    }
                    Ok(n)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 1);
        assert_eq!(stats.retries, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_exhaustion_surfaces_timeout() {
        let options = InvokeOptions::new()
            .with_max_retries(0)
            .with_timeout(Some(Duration::from_millis(50)));
        let err = invoke(
            || async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, Error>(())
            },
            options,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Timeout { timeout_ms: 50 }));
        assert_eq!(err.classification(), ErrorClass::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_hint_is_used() {
        let calls = Arc::new(AtomicU32::new(0));
        let invoker = ResilientInvoker::new(InvokeOptions::new().with_max_retries(1));

        let c = calls.clone();
        let (_, stats) = invoker
            .invoke_with_stats(move || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(Error::remote(
                            "slow down",
                            ResponseMeta::with_status(429).with_header("retry-after", "5"),
                        ))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(stats.total_backoff, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unusable_retry_after_falls_back_to_schedule() {
        let calls = Arc::new(AtomicU32::new(0));
        let invoker = ResilientInvoker::new(InvokeOptions::new().with_max_retries(1))
            .with_backoff(BackoffPolicy::without_jitter());

        let c = calls.clone();
        let (_, stats) = invoker
            .invoke_with_stats(move || {
                let c = c.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(Error::remote(
                            "slow down",
                            ResponseMeta::with_status(429).with_header("retry-after-ms", "1e30"),
                        ))
                    } else {
                        Ok(())
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(stats.attempts, 2);
        assert_eq!(stats.total_backoff, Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_unknown_is_terminal() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let res = invoke(
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::runtime("something odd"))
                }
            },
            InvokeOptions::default(),
        )
        .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
