//! 用量统计与成本估算模块：累计成功调用的消耗计数并估算费用。
//!
//! # Usage Aggregation Module
//!
//! Accumulates consumption counters reported by successful calls and derives a cost
//! estimate from a per-provider price list.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`UsageCounters`] | Running totals for one batch; never decrease |
//! | [`UsageDelta`] | Consumption reported by one successful call |
//! | [`UsageAggregator`] | Sole mutator of the counters plus cost lookup |
//! | [`PricingTable`] | Ordered provider/model price list with graceful fallback |
//! | [`ModelPricing`] | Per-1K-unit input/output rates |
//! | [`CostEstimate`] | Cost breakdown for one lookup |
//!
//! ## Example
//!
//! ```rust
//! use ai_lib_orchestrator::usage::{UsageAggregator, UsageDelta};
//!
//! let mut total = UsageAggregator::empty();
//! UsageAggregator::add(&mut total, Some(&UsageDelta::new(10, 5)));
//! UsageAggregator::add(&mut total, None);
//! assert_eq!(total.total_units, 15);
//!
//! let cost = UsageAggregator::default().cost("openai", "gpt-4o-mini", 1000, 1000);
//! assert!(cost > 0.0);
//! ```

mod pricing;

pub use pricing::{CostEstimate, ModelPricing, PricingTable};

use serde::{Deserialize, Serialize};

/// Running consumption totals. Fields only ever grow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub input_units: u64,
    pub output_units: u64,
    pub total_units: u64,
    pub estimated_cost: f64,
}

/// Consumption reported by one successful call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageDelta {
    pub input_units: u64,
    pub output_units: u64,
    /// Provider-reported total; `input + output` when absent.
    #[serde(default)]
    pub total_units: Option<u64>,
    #[serde(default)]
    pub estimated_cost: Option<f64>,
}

impl UsageDelta {
    pub fn new(input_units: u64, output_units: u64) -> Self {
        Self {
            input_units,
            output_units,
            total_units: None,
            estimated_cost: None,
        }
    }

    pub fn with_total(mut self, total: u64) -> Self {
        self.total_units = Some(total);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.estimated_cost = Some(cost);
        self
    }

    pub fn total(&self) -> u64 {
        self.total_units
            .unwrap_or_else(|| self.input_units.saturating_add(self.output_units))
    }
}

/// Owns the pricing table and is the only code path that mutates [`UsageCounters`].
#[derive(Debug, Clone, Default)]
pub struct UsageAggregator {
    pricing: PricingTable,
}

impl UsageAggregator {
    pub fn new(pricing: PricingTable) -> Self {
        Self { pricing }
    }

    pub fn pricing(&self) -> &PricingTable {
        &self.pricing
    }

    pub fn empty() -> UsageCounters {
        UsageCounters::default()
    }

    /// Fold `delta` into `total`. `None` is a no-op.
    ///
    /// Counters saturate instead of wrapping; negative or non-finite costs are ignored.
    pub fn add(total: &mut UsageCounters, delta: Option<&UsageDelta>) {
        let Some(d) = delta else {
            return;
        };
        total.input_units = total.input_units.saturating_add(d.input_units);
        total.output_units = total.output_units.saturating_add(d.output_units);
        total.total_units = total.total_units.saturating_add(d.total());
        if let Some(c) = d.estimated_cost {
            if c.is_finite() && c > 0.0 {
                total.estimated_cost += c;
            }
        }
    }

    pub fn cost(&self, provider: &str, model: &str, input_units: u64, output_units: u64) -> f64 {
        self.estimate(provider, model, input_units, output_units)
            .total_cost
    }

    pub fn estimate(
        &self,
        provider: &str,
        model: &str,
        input_units: u64,
        output_units: u64,
    ) -> CostEstimate {
        self.pricing
            .resolve(provider, model)
            .calculate_cost(input_units, output_units)
    }
}
