//! Provider seam: one opaque async unit of remote work.

use crate::batch::{BatchItem, BatchReport, BatchScheduler, CancellationToken, ProgressSink};
use crate::resilience::ResilientInvoker;
use crate::usage::UsageDelta;
use crate::Result;
use async_trait::async_trait;

/// Value returned by a successful call, with the consumption it reported.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse<V> {
    pub value: V,
    pub usage: Option<UsageDelta>,
}

impl<V> ProviderResponse<V> {
    pub fn new(value: V) -> Self {
        Self { value, usage: None }
    }

    pub fn with_usage(mut self, usage: UsageDelta) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// A remote analysis backend.
///
/// Implementations own the wire format. On failure they should return
/// [`crate::Error::Remote`] with the response status and headers so the invoker can
/// classify the failure and honour `Retry-After`.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    type Request: Send + Sync;
    type Value: Send;

    /// Provider id used for pricing lookups (e.g. `"openai"`).
    fn provider_id(&self) -> &str;

    /// Model id used for pricing lookups.
    fn model(&self) -> &str;

    async fn call(&self, request: &Self::Request) -> Result<ProviderResponse<Self::Value>>;
}

/// Run every request through `provider`, each call wrapped by `invoker`, scheduled by
/// `scheduler`. Usage deltas without a cost are priced for the provider's model.
pub async fn run_provider_batch<P>(
    provider: &P,
    requests: Vec<BatchItem<P::Request>>,
    invoker: &ResilientInvoker,
    scheduler: &BatchScheduler,
    cancel: &CancellationToken,
    progress: Option<&dyn ProgressSink>,
) -> Result<BatchReport<P::Value>>
where
    P: AnalysisProvider,
{
    let scheduler = scheduler
        .clone()
        .with_pricing(provider.provider_id(), provider.model());

    scheduler
        .run_batch(
            requests,
            |item| async move { invoker.invoke(|| provider.call(&item.payload)).await },
            cancel,
            progress,
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_class::ErrorClass;
    use crate::resilience::{BackoffPolicy, InvokeOptions};
    use crate::response::ResponseMeta;
    use crate::Error;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Fails each prompt a configured number of times with the given status first.
    struct ScriptedProvider {
        failures: Mutex<HashMap<String, (u16, u32)>>,
    }

    #[async_trait]
    impl AnalysisProvider for ScriptedProvider {
        type Request = String;
        type Value = usize;

        fn provider_id(&self) -> &str {
            "anthropic"
        }

        fn model(&self) -> &str {
            "claude-3-haiku-20240307"
        }

        async fn call(&self, request: &String) -> Result<ProviderResponse<usize>> {
            let mut failures = self.failures.lock().unwrap();
            if let Some((status, left)) = failures.get_mut(request) {
                if *left > 0 {
                    *left -= 1;
                    return Err(Error::remote(
                        format!("HTTP {} for {}", status, request),
                        ResponseMeta::with_status(*status),
                    ));
                }
            }
            Ok(ProviderResponse::new(request.len()).with_usage(UsageDelta::new(100, 20)))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_batch_retries_and_isolates() {
        let mut failures = HashMap::new();
        failures.insert("flaky".to_string(), (503, 2));
        failures.insert("denied".to_string(), (403, u32::MAX));
        let provider = ScriptedProvider {
            failures: Mutex::new(failures),
        };

        let invoker = ResilientInvoker::new(InvokeOptions::new().with_max_retries(3))
            .with_backoff(BackoffPolicy::without_jitter());
        let requests = BatchItem::from_payloads(
            ["ok", "flaky", "denied", "fine"].map(String::from),
        );

        let report = run_provider_batch(
            &provider,
            requests,
            &invoker,
            &BatchScheduler::new(2),
            &CancellationToken::new(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(report.outcomes[0].value(), Some(&2));
        assert_eq!(report.outcomes[1].value(), Some(&5));
        assert_eq!(report.outcomes[2].class(), Some(ErrorClass::Auth));
        assert_eq!(report.outcomes[2].error_message(), Some("HTTP 403 for denied"));
        assert_eq!(report.outcomes[3].value(), Some(&4));
        assert_eq!(report.usage.input_units, 300);
        assert_eq!(report.usage.total_units, 360);
        assert!(report.usage.estimated_cost > 0.0);
    }
}
