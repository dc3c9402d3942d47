//! # ai-lib-orchestrator
//!
//! 面向限流远程 AI 调用的弹性批处理编排层。
//!
//! Resilient batch orchestration for many independent, rate-limited remote calls.
//!
//! ## Overview
//!
//! The crate drives a list of items through a caller-supplied async worker with a hard
//! concurrency bound, retries transient failures with jittered exponential backoff, keeps one
//! item's failure from touching any other, and folds reported consumption into a usage total
//! with a cost estimate.
//!
//! ## Core Philosophy
//!
//! - **Ordered**: outcome `i` always belongs to input `i`, whatever the completion order
//! - **Isolated**: item failures become failed outcomes, never batch failures
//! - **Classified**: every failure lands in one [`ErrorClass`] that decides retry eligibility
//! - **Cooperative**: cancellation is an explicit [`CancellationToken`] polled between windows
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ai_lib_orchestrator::batch::{BatchItem, CancellationToken};
//! use ai_lib_orchestrator::provider::ProviderResponse;
//! use ai_lib_orchestrator::OrchestratorConfig;
//!
//! #[tokio::main]
//! async fn main() -> ai_lib_orchestrator::Result<()> {
//!     let config = OrchestratorConfig::default().apply_env_overrides();
//!     config.validate()?;
//!     let invoker = config.invoker();
//!     let scheduler = config.scheduler();
//!     let token = CancellationToken::new();
//!
//!     let items = BatchItem::from_payloads(vec!["doc-a", "doc-b", "doc-c"]);
//!     let report = scheduler
//!         .run_batch(
//!             items,
//!             |item| {
//!                 let invoker = &invoker;
//!                 async move {
//!                     invoker
//!                         .invoke(|| async { Ok(ProviderResponse::new(item.payload.len())) })
//!                         .await
//!                 }
//!             },
//!             &token,
//!             None,
//!         )
//!         .await?;
//!
//!     println!("{} / {} succeeded", report.success_count(), report.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`batch`] | Windowed scheduler, outcomes, cancellation, progress |
//! | [`resilience`] | Backoff policy and resilient invoker |
//! | [`classify`] | Failure classification |
//! | [`error_class`] | The classification taxonomy |
//! | [`response`] | Response metadata and `Retry-After` parsing |
//! | [`usage`] | Usage counters, aggregation and pricing |
//! | [`provider`] | The provider seam and provider batches |
//! | [`config`] | YAML/JSON configuration with env overrides |

pub mod batch;
pub mod classify;
pub mod config;
pub mod error_class;
pub mod provider;
pub mod resilience;
pub mod response;
pub mod usage;

// Re-export main types for convenience
pub use batch::{BatchItem, BatchReport, BatchScheduler, CancellationToken, Outcome, ProgressSink};
pub use classify::{classify, is_retryable};
pub use config::OrchestratorConfig;
pub use error_class::ErrorClass;
pub use provider::{run_provider_batch, AnalysisProvider, ProviderResponse};
pub use resilience::{invoke, BackoffPolicy, InvokeOptions, ResilientInvoker};
pub use response::ResponseMeta;
pub use usage::{UsageAggregator, UsageCounters, UsageDelta};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
