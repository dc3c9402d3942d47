//! 批处理调度模块：有界并发窗口执行、保序输出、单项故障隔离与协作式取消。
//!
//! # Batch Scheduling Module
//!
//! Drives many independent remote calls with a hard concurrency bound while keeping the
//! output aligned with the input.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`BatchScheduler`] | Windowed executor (`concurrency` items per window) |
//! | [`BatchItem`] | Caller id + payload |
//! | [`Outcome`] | Per-item value or failure, at the item's original index |
//! | [`BatchReport`] | Ordered outcomes plus aggregated usage |
//! | [`CancellationToken`] | Caller-owned stop flag, polled between windows |
//! | [`ProgressSink`] | Advisory "completed X/N" observer |
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_orchestrator::batch::{BatchItem, BatchScheduler, CancellationToken};
//! use ai_lib_orchestrator::provider::ProviderResponse;
//!
//! # async fn run() -> ai_lib_orchestrator::Result<()> {
//! let scheduler = BatchScheduler::new(3);
//! let token = CancellationToken::new();
//! let items = BatchItem::from_payloads(vec!["a", "b", "c", "d"]);
//!
//! let report = scheduler
//!     .run_batch(
//!         items,
//!         |item| async move { Ok(ProviderResponse::new(item.payload.len())) },
//!         &token,
//!         None,
//!     )
//!     .await?;
//! assert_eq!(report.windows, 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## Windows vs. sliding pool
//!
//! Window `k + 1` starts only after every item of window `k` resolved. Peak concurrency is
//! exactly `concurrency`, and usage is folded in on one sequential path per window so the
//! counters need no lock.

mod cancel;
mod outcome;
mod progress;
mod scheduler;

pub use cancel::CancellationToken;
pub use outcome::{BatchItem, BatchReport, ItemFailure, Outcome};
pub use progress::{InMemoryProgressSink, NoopProgressSink, ProgressSink};
pub use scheduler::{BatchScheduler, DEFAULT_CONCURRENCY};
