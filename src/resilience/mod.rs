//! 弹性调用模块：单次远程调用的超时、重试与指数退避。
//!
//! # Resilience Module
//!
//! Wraps one remote call so that transient failures are retried and terminal ones surface
//! immediately with their original message.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BackoffPolicy`] | Exponential delay with jitter and `Retry-After` override |
//! | [`ResilientInvoker`] | Timeout + classification-driven retry loop |
//! | [`InvokeOptions`] | Retry count, delay bounds and per-attempt timeout |
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_orchestrator::resilience::{InvokeOptions, ResilientInvoker};
//! use std::time::Duration;
//!
//! # async fn run() -> ai_lib_orchestrator::Result<()> {
//! let invoker = ResilientInvoker::new(
//!     InvokeOptions::new()
//!         .with_max_retries(2)
//!         .with_timeout(Some(Duration::from_secs(10))),
//! );
//! let answer = invoker.invoke(|| async { Ok::<_, ai_lib_orchestrator::Error>(42) }).await?;
//! assert_eq!(answer, 42);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod invoker;

pub use backoff::BackoffPolicy;
pub use invoker::{invoke, InvokeOptions, InvokeStats, ResilientInvoker, RetryState};
