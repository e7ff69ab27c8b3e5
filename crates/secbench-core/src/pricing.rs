//! Per-token pricing lookup and cost estimation.
//!
//! Prices come from the LiteLLM model registry, a single JSON document keyed
//! by model name. Lookups are best effort: any failure prices the model at
//! zero so an evaluation never stops because pricing is unavailable.

use crate::error::Result;
use crate::types::TokenUsage;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub const LITELLM_PRICES_URL: &str =
    "https://raw.githubusercontent.com/BerriAI/litellm/main/model_prices_and_context_window.json";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PriceEntry {
    #[serde(default)]
    pub input_cost_per_token: f64,
    #[serde(default)]
    pub output_cost_per_token: f64,
}

impl PriceEntry {
    pub const ZERO: PriceEntry = PriceEntry {
        input_cost_per_token: 0.0,
        output_cost_per_token: 0.0,
    };

    /// Negative or non-finite prices are treated as free.
    pub fn new(input_cost_per_token: f64, output_cost_per_token: f64) -> Self {
        Self {
            input_cost_per_token: sanitize_price(input_cost_per_token),
            output_cost_per_token: sanitize_price(output_cost_per_token),
        }
    }

    pub fn is_free(&self) -> bool {
        self.input_cost_per_token == 0.0 && self.output_cost_per_token == 0.0
    }
}

fn sanitize_price(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

pub fn estimate_cost(usage: &TokenUsage, price: &PriceEntry) -> f64 {
    usage.input_tokens as f64 * price.input_cost_per_token
        + usage.output_tokens as f64 * price.output_cost_per_token
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// `Ok(None)` when the source has no entry for the model.
    async fn fetch_price(&self, model: &str) -> Result<Option<PriceEntry>>;
}

/// Reads prices from a LiteLLM-style registry document over HTTP.
pub struct RegistryPriceSource {
    url: String,
    client: reqwest::Client,
}

impl RegistryPriceSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl PriceSource for RegistryPriceSource {
    async fn fetch_price(&self, model: &str) -> Result<Option<PriceEntry>> {
        let registry: Value = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(registry.get(model).map(entry_from_registry))
    }
}

fn entry_from_registry(value: &Value) -> PriceEntry {
    let field = |name: &str| value.get(name).and_then(Value::as_f64).unwrap_or(0.0);
    PriceEntry::new(field("input_cost_per_token"), field("output_cost_per_token"))
}

/// Fixed price table, for offline runs and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    prices: HashMap<String, PriceEntry>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, model: impl Into<String>, price: PriceEntry) -> Self {
        self.prices.insert(model.into(), price);
        self
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch_price(&self, model: &str) -> Result<Option<PriceEntry>> {
        Ok(self.prices.get(model).copied())
    }
}

/// Price entries resolved during one run, keyed by model identifier.
///
/// Each model is looked up at most once; failed lookups are remembered as
/// zero-cost entries.
#[derive(Debug, Clone, Default)]
pub struct PriceCache {
    entries: HashMap<String, PriceEntry>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, model: &str) -> Option<PriceEntry> {
        self.entries.get(model).copied()
    }

    pub fn insert(&mut self, model: impl Into<String>, price: PriceEntry) {
        self.entries.insert(model.into(), price);
    }

    pub async fn price_for(&mut self, model: &str, source: &dyn PriceSource) -> PriceEntry {
        if let Some(price) = self.get(model) {
            return price;
        }

        let price = match source.fetch_price(model).await {
            Ok(Some(price)) => {
                debug!(model, ?price, "resolved model pricing");
                price
            }
            Ok(None) => {
                warn!(model, "model not found in price registry, cost will be reported as zero");
                PriceEntry::ZERO
            }
            Err(e) => {
                warn!(model, error = %e, "price lookup failed, cost will be reported as zero");
                PriceEntry::ZERO
            }
        };
        self.insert(model, price);
        price
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SecbenchError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        result: Option<PriceEntry>,
        fail: bool,
    }

    #[async_trait]
    impl PriceSource for CountingSource {
        async fn fetch_price(&self, _model: &str) -> Result<Option<PriceEntry>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SecbenchError::Internal(anyhow::anyhow!("offline")));
            }
            Ok(self.result)
        }
    }

    #[test]
    fn estimate_multiplies_tokens_by_price() {
        let usage = TokenUsage {
            input_tokens: 1_000,
            output_tokens: 200,
        };
        let price = PriceEntry::new(0.000_002, 0.000_01);
        assert!((estimate_cost(&usage, &price) - 0.004).abs() < 1e-12);
        assert_eq!(estimate_cost(&TokenUsage::default(), &price), 0.0);
    }

    #[test]
    fn invalid_prices_are_zeroed() {
        let price = PriceEntry::new(-1.0, f64::NAN);
        assert!(price.is_free());
    }

    #[tokio::test]
    async fn cache_looks_up_each_model_once() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            result: Some(PriceEntry::new(1e-6, 2e-6)),
            fail: false,
        };
        let mut cache = PriceCache::new();
        let first = cache.price_for("gpt-4o", &source).await;
        let second = cache.price_for("gpt-4o", &source).await;
        assert_eq!(first, second);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.get("gpt-4o"), Some(first));
    }

    #[tokio::test]
    async fn failed_lookup_yields_zero_and_is_not_retried() {
        let source = CountingSource {
            calls: AtomicUsize::new(0),
            result: None,
            fail: true,
        };
        let mut cache = PriceCache::new();
        assert_eq!(cache.price_for("m", &source).await, PriceEntry::ZERO);
        assert_eq!(cache.price_for("m", &source).await, PriceEntry::ZERO);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_model_yields_zero() {
        let source = StaticPriceSource::new().with_price("known", PriceEntry::new(1e-6, 1e-6));
        let mut cache = PriceCache::new();
        assert_eq!(cache.price_for("unknown", &source).await, PriceEntry::ZERO);
        assert!(!cache.price_for("known", &source).await.is_free());
    }
}
