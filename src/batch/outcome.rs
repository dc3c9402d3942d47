//! Batch items, per-item outcomes and the batch report.

use crate::error_class::ErrorClass;
use crate::usage::{UsageCounters, UsageDelta};
use serde::Serialize;
use std::time::Duration;

/// One unit of work: caller id plus payload, immutable for the life of the batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem<T> {
    pub id: String,
    pub payload: T,
}

impl<T> BatchItem<T> {
    pub fn new(id: impl Into<String>, payload: T) -> Self {
        Self {
            id: id.into(),
            payload,
        }
    }

    /// Wrap bare payloads, using their position as id.
    pub fn from_payloads(payloads: impl IntoIterator<Item = T>) -> Vec<Self> {
        payloads
            .into_iter()
            .enumerate()
            .map(|(i, p)| Self::new(i.to_string(), p))
            .collect()
    }
}

/// Terminal failure of one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub message: String,
    pub class: ErrorClass,
}

impl ItemFailure {
    /// Message plus the remedy for its class, e.g. for display next to the item.
    pub fn actionable_message(&self) -> String {
        format!("{} ({})", self.message, self.class.hint())
    }
}

/// Result for one item, written once at its original index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome<R> {
    pub item_index: usize,
    pub item_id: String,
    pub result: std::result::Result<R, ItemFailure>,
    pub usage: Option<UsageDelta>,
}

impl<R> Outcome<R> {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(&self) -> Option<&R> {
        self.result.as_ref().ok()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.result.as_ref().err().map(|f| f.message.as_str())
    }

    pub fn class(&self) -> Option<ErrorClass> {
        self.result.as_ref().err().map(|f| f.class)
    }
}

/// Everything a completed batch produced, outcomes in input order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport<R> {
    pub batch_id: String,
    pub outcomes: Vec<Outcome<R>>,
    pub usage: UsageCounters,
    pub windows: usize,
    pub elapsed: Duration,
}

impl<R> BatchReport<R> {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
    pub fn success_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }
    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.is_success())
    }
    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.success_count() as f64 / self.len() as f64
        }
    }
    pub fn failures(&self) -> impl Iterator<Item = &Outcome<R>> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
    pub fn into_values(self) -> Vec<Option<R>> {
        self.outcomes.into_iter().map(|o| o.result.ok()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(i: usize) -> Outcome<u32> {
        Outcome {
            item_index: i,
            item_id: i.to_string(),
            result: Ok(i as u32),
            usage: None,
        }
    }

    fn failed(i: usize) -> Outcome<u32> {
        Outcome {
            item_index: i,
            item_id: i.to_string(),
            result: Err(ItemFailure {
                message: "bad key".into(),
                class: ErrorClass::Auth,
            }),
            usage: None,
        }
    }

    #[test]
    fn test_report_counts() {
        let report = BatchReport {
            batch_id: "b".into(),
            outcomes: vec![ok(0), failed(1), ok(2), ok(3)],
            usage: UsageCounters::default(),
            windows: 2,
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.success_count(), 3);
        assert_eq!(report.failure_count(), 1);
        assert!(!report.all_succeeded());
        assert!((report.success_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(report.failures().next().map(|o| o.item_index), Some(1));
        assert_eq!(report.into_values(), vec![Some(0), None, Some(2), Some(3)]);
    }

    #[test]
    fn test_outcome_accessors() {
        let f = failed(4);
        assert!(!f.is_success());
        assert_eq!(f.error_message(), Some("bad key"));
        assert_eq!(f.class(), Some(ErrorClass::Auth));
        assert_eq!(f.value(), None);
        let msg = f.result.unwrap_err().actionable_message();
        assert!(msg.starts_with("bad key ("));
    }

    #[test]
    fn test_from_payloads_assigns_positional_ids() {
        let items = BatchItem::from_payloads(vec!["a", "b"]);
        assert_eq!(items[1].id, "1");
        assert_eq!(items[1].payload, "b");
    }
}
