//! Windowed batch scheduler.

use super::cancel::CancellationToken;
use super::outcome::{BatchItem, BatchReport, ItemFailure, Outcome};
use super::progress::ProgressSink;
use crate::config::OrchestratorConfig;
use crate::error_class::ErrorClass;
use crate::provider::ProviderResponse;
use crate::usage::{PricingTable, UsageAggregator, UsageDelta};
use crate::{Error, Result};
use futures::future::join_all;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const DEFAULT_CONCURRENCY: usize = 3;

/// Runs items in consecutive windows of `concurrency`, each window fully resolved before
/// the next starts.
///
/// - output order equals input order
/// - a failing (or panicking) worker only fails its own item
/// - cancellation is polled at entry and between windows
#[derive(Debug, Clone)]
pub struct BatchScheduler {
    concurrency: usize,
    aggregator: UsageAggregator,
    pricing_target: Option<(String, String)>,
}

impl Default for BatchScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CONCURRENCY)
    }
}

impl BatchScheduler {
    /// `concurrency` of 0 is treated as 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            aggregator: UsageAggregator::default(),
            pricing_target: None,
        }
    }

    pub fn from_config(config: &OrchestratorConfig) -> Self {
        Self::new(config.batch.concurrency)
            .with_aggregator(UsageAggregator::new(PricingTable::from_entries(&config.pricing)))
    }

    pub fn with_aggregator(mut self, aggregator: UsageAggregator) -> Self {
        self.aggregator = aggregator;
        self
    }

    /// Price usage deltas that arrive without a cost using this provider/model.
    pub fn with_pricing(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.pricing_target = Some((provider.into(), model.into()));
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn aggregator(&self) -> &UsageAggregator {
        &self.aggregator
    }

    /// Run `worker` over every item.
    ///
    /// Returns `Error::Cancelled` (and no outcomes) if `cancel` is set at entry or at any
    /// window boundary. Item failures never surface here; they become failed outcomes.
    pub async fn run_batch<T, R, F, Fut>(
        &self,
        items: Vec<BatchItem<T>>,
        worker: F,
        cancel: &CancellationToken,
        progress: Option<&dyn ProgressSink>,
    ) -> Result<BatchReport<R>>
    where
        F: Fn(BatchItem<T>) -> Fut,
        Fut: Future<Output = Result<ProviderResponse<R>>>,
    {
        let batch_id = Uuid::new_v4().to_string();
        let total = items.len();
        let start = Instant::now();

        if cancel.is_cancelled() {
            info!(batch_id = %batch_id, total, "batch cancelled before start");
            return Err(Error::Cancelled {
                completed_windows: 0,
                total_items: total,
            });
        }

        info!(
            batch_id = %batch_id,
            total,
            concurrency = self.concurrency,
            "batch started"
        );

        let mut slots: Vec<Option<Outcome<R>>> = (0..total).map(|_| None).collect();
        let mut usage = UsageAggregator::empty();
        let mut windows = 0usize;
        let mut completed = 0usize;
        let mut pending = items.into_iter().enumerate();
        let worker = &worker;

        loop {
            let window: Vec<(usize, BatchItem<T>)> =
                pending.by_ref().take(self.concurrency).collect();
            if window.is_empty() {
                break;
            }

            if cancel.is_cancelled() {
                info!(
                    batch_id = %batch_id,
                    completed_windows = windows,
                    completed,
                    total,
                    "batch cancelled, discarding partial results"
                );
                return Err(Error::Cancelled {
                    completed_windows: windows,
                    total_items: total,
                });
            }

            debug!(batch_id = %batch_id, window = windows, size = window.len(), "window started");

            let launched = window.into_iter().map(|(index, item)| {
                let item_id = item.id.clone();
                async move {
                    let res = AssertUnwindSafe(async move { worker(item).await })
                        .catch_unwind()
                        .await;
                    (index, item_id, res)
                }
            });
            let resolved = join_all(launched).await;

            // Single completion path: the only place usage is folded in.
            for (index, item_id, res) in resolved {
                let outcome = match res {
                    Ok(Ok(resp)) => {
                        let delta = resp.usage.map(|d| self.price(d));
                        UsageAggregator::add(&mut usage, delta.as_ref());
                        Outcome {
                            item_index: index,
                            item_id,
                            result: Ok(resp.value),
                            usage: delta,
                        }
                    }
                    Ok(Err(e)) => {
                        let class = e.classification();
                        warn!(
                            batch_id = %batch_id,
                            item_index = index,
                            item_id = %item_id,
                            class = class.name(),
                            error = %e,
                            "item failed"
                        );
                        Outcome {
                            item_index: index,
                            item_id,
                            result: Err(ItemFailure {
                                message: e.to_string(),
                                class,
                            }),
                            usage: None,
                        }
                    }
                    Err(panic) => {
                        let message = panic_message(&*panic);
                        warn!(batch_id = %batch_id, item_index = index, "worker panicked: {}", message);
                        Outcome {
                            item_index: index,
                            item_id,
                            result: Err(ItemFailure {
                                message: format!("worker panicked: {}", message),
                                class: ErrorClass::Unknown,
                            }),
                            usage: None,
                        }
                    }
                };
                slots[index] = Some(outcome);
                completed += 1;
            }

            windows += 1;
            if let Some(p) = progress {
                p.notify(&format!("completed {}/{}", completed, total));
            }
        }

        let outcomes: Vec<Outcome<R>> = slots.into_iter().flatten().collect();
        if outcomes.len() != total {
            return Err(Error::runtime("batch result missing"));
        }

        let report = BatchReport {
            batch_id,
            outcomes,
            usage,
            windows,
            elapsed: start.elapsed(),
        };
        info!(
            batch_id = %report.batch_id,
            succeeded = report.success_count(),
            failed = report.failure_count(),
            windows = report.windows,
            total_units = report.usage.total_units,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "batch finished"
        );
        Ok(report)
    }

    fn price(&self, mut delta: UsageDelta) -> UsageDelta {
        if delta.estimated_cost.is_none() {
            if let Some((provider, model)) = &self.pricing_target {
                delta.estimated_cost = Some(self.aggregator.cost(
                    provider,
                    model,
                    delta.input_units,
                    delta.output_units,
                ));
            }
        }
        delta
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
