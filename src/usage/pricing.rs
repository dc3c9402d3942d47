//! Model pricing and cost estimation.

use crate::config::PricingEntry;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub provider: String,
    pub model: String,
    pub input_cost_per_1k: f64,
    pub output_cost_per_1k: f64,
    pub currency: String,
}

impl ModelPricing {
    pub fn new(provider: &str, model: &str, input: f64, output: f64) -> Self {
        Self {
            provider: provider.into(),
            model: model.into(),
            input_cost_per_1k: input,
            output_cost_per_1k: output,
            currency: "USD".into(),
        }
    }

    /// Rate used when neither provider nor model is known.
    pub fn fallback() -> Self {
        Self::new("default", "default", 0.001, 0.002)
    }

    pub fn calculate_cost(&self, input_units: u64, output_units: u64) -> CostEstimate {
        let ic = (input_units as f64 / 1000.0) * self.input_cost_per_1k;
        let oc = (output_units as f64 / 1000.0) * self.output_cost_per_1k;
        CostEstimate {
            model: self.model.clone(),
            input_units,
            output_units,
            input_cost: ic,
            output_cost: oc,
            total_cost: ic + oc,
            currency: self.currency.clone(),
        }
    }
}

impl From<&PricingEntry> for ModelPricing {
    fn from(e: &PricingEntry) -> Self {
        Self::new(
            &e.provider,
            &e.model,
            e.input_cost_per_1k,
            e.output_cost_per_1k,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub model: String,
    pub input_units: u64,
    pub output_units: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub currency: String,
}

impl CostEstimate {
    pub fn format(&self) -> String {
        format!("{} {:.6}", self.currency, self.total_cost)
    }
    pub fn format_detailed(&self) -> String {
        if self.total_cost < 0.01 {
            format!("{:.4}¢", self.total_cost * 100.0)
        } else {
            format!("${:.4}", self.total_cost)
        }
    }
}

static BUILTIN: Lazy<Vec<ModelPricing>> = Lazy::new(|| {
    vec![
        ModelPricing::new("openai", "gpt-4o", 0.0025, 0.01),
        ModelPricing::new("openai", "gpt-4o-mini", 0.00015, 0.0006),
        ModelPricing::new("anthropic", "claude-3-5-sonnet", 0.003, 0.015),
        ModelPricing::new("anthropic", "claude-3-haiku", 0.00025, 0.00125),
        ModelPricing::new("google", "gemini-1.5-pro", 0.00125, 0.005),
        ModelPricing::new("google", "gemini-1.5-flash", 0.000075, 0.0003),
        ModelPricing::new("deepseek", "deepseek-chat", 0.00027, 0.0011),
    ]
});

/// Ordered per-provider price list.
///
/// Lookup never fails: exact match, then the longest known model key contained in the
/// requested id, then the provider's first listed model, then [`ModelPricing::fallback`].
#[derive(Debug, Clone, PartialEq)]
pub struct PricingTable {
    entries: Vec<ModelPricing>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            entries: BUILTIN.clone(),
        }
    }
}

impl PricingTable {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Built-in table extended (or overridden, on exact provider+model) by `entries`.
    pub fn from_entries(entries: &[PricingEntry]) -> Self {
        let mut table = Self::default();
        for e in entries {
            table.insert(ModelPricing::from(e));
        }
        table
    }

    pub fn insert(&mut self, pricing: ModelPricing) {
        match self.entries.iter_mut().find(|p| {
            p.provider.eq_ignore_ascii_case(&pricing.provider)
                && p.model.eq_ignore_ascii_case(&pricing.model)
        }) {
            Some(existing) => *existing = pricing,
            None => self.entries.push(pricing),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, provider: &str, model: &str) -> ModelPricing {
        let model_lc = model.to_lowercase();
        let for_provider: Vec<&ModelPricing> = self
            .entries
            .iter()
            .filter(|p| p.provider.eq_ignore_ascii_case(provider))
            .collect();

        if let Some(p) = for_provider
            .iter()
            .find(|p| p.model.to_lowercase() == model_lc)
        {
            return (*p).clone();
        }

        if let Some(p) = for_provider
            .iter()
            .filter(|p| model_lc.contains(&p.model.to_lowercase()))
            .max_by_key(|p| p.model.len())
        {
            return (*p).clone();
        }

        for_provider
            .first()
            .map(|p| (*p).clone())
            .unwrap_or_else(ModelPricing::fallback)
    }
}
