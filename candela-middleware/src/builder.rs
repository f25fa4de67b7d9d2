//! Builder for composing providers with middleware layers.
//!
//! # Layer order
//!
//! Middleware layers form an "onion" around the raw provider:
//!
//! ```text
//! Fetcher request
//!     ↓
//! Outermost Middleware (e.g., Quota - waits for budget first)
//!     ↓
//! Inner Middleware (e.g., Timeout - bounds the actual call)
//!     ↓
//! Raw Provider (e.g., Binance - makes actual API calls)
//! ```
//!
//! The `layers` vector stores middleware in **outermost-first** order (last
//! added = outermost), and they are **applied in reverse** during `build()`.
//!
//! ```text
//! builder.with_timeout(..).with_quota(..)
//!
//! Storage: [Quota, Timeout]  (outermost first)
//! Applied:  Raw -> Timeout -> Quota
//! Result:   Quota(Timeout(Raw))
//! ```
//!
//! `with_timeout` always places the timeout directly around the raw provider,
//! so time spent waiting for quota is never charged to the call.

use std::sync::Arc;
use std::time::Duration;

use candela_core::{FetchWindow, Middleware, QuotaConfig, QuotaConsumptionStrategy};
use serde_json::json;

use crate::quota::QuotaMiddleware;
use crate::timeout::TimeoutMiddleware;

const QUOTA: &str = "QuotaAwareProvider";
const TIMEOUT: &str = "TimeoutProvider";

/// Generic middleware builder for composing a provider with layered wrappers.
///
/// Layer order is described in the [module docs](self).
pub struct ProviderBuilder {
    raw: Arc<dyn FetchWindow>,
    /// Wrappers, outermost first.
    layers: Vec<Box<dyn Middleware>>,
}

impl ProviderBuilder {
    /// Create a new builder from a raw, unwrapped provider.
    #[must_use]
    pub fn new(raw: Arc<dyn FetchWindow>) -> Self {
        Self {
            raw,
            layers: Vec::new(),
        }
    }

    fn existing_quota_config(&self) -> Option<QuotaConfig> {
        let layer = self.layers.iter().find(|l| l.name() == QUOTA)?;
        let cfg = layer.config_json();
        let defaults = QuotaConfig::default();
        let limit = cfg
            .get("limit")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(defaults.limit);
        let window_ms = cfg
            .get("window_ms")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(defaults.window_ms);
        let strategy = match cfg.get("strategy").and_then(|v| v.as_str()) {
            Some("EvenSpread") => QuotaConsumptionStrategy::EvenSpread,
            Some("Unit") => QuotaConsumptionStrategy::Unit,
            _ => defaults.strategy,
        };
        Some(QuotaConfig {
            limit,
            window_ms,
            strategy,
        })
    }

    /// Add or replace quota configuration at the outermost position.
    #[must_use]
    pub fn with_quota(mut self, cfg: &QuotaConfig) -> Self {
        self.layers.retain(|m| m.name() != QUOTA);
        self.layers
            .insert(0, Box::new(QuotaMiddleware::new(cfg.clone())));
        self
    }

    /// Drop the quota layer, if any.
    #[must_use]
    pub fn without_quota(mut self) -> Self {
        self.layers.retain(|m| m.name() != QUOTA);
        self
    }

    /// Set the calls allowed per window, keeping any configured window and strategy.
    #[must_use]
    pub fn quota_limit(self, limit: u64) -> Self {
        let mut cfg = self.existing_quota_config().unwrap_or_default();
        cfg.limit = limit;
        self.with_quota(&cfg)
    }

    /// Set the quota window length, keeping any configured limit and strategy.
    #[must_use]
    pub fn quota_window(self, window: Duration) -> Self {
        let mut cfg = self.existing_quota_config().unwrap_or_default();
        cfg.window_ms = window.as_millis().try_into().unwrap_or(u64::MAX);
        self.with_quota(&cfg)
    }

    /// Set how calls are spread over the window, keeping limit and window.
    #[must_use]
    pub fn quota_strategy(self, strategy: QuotaConsumptionStrategy) -> Self {
        let mut cfg = self.existing_quota_config().unwrap_or_default();
        cfg.strategy = strategy;
        self.with_quota(&cfg)
    }

    /// Add or replace the per-call timeout, innermost (directly around the raw provider).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.layers.retain(|m| m.name() != TIMEOUT);
        self.layers.push(Box::new(TimeoutMiddleware::new(timeout)));
        self
    }

    /// Remove the timeout if present.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.layers.retain(|m| m.name() != TIMEOUT);
        self
    }

    /// Wrap everything built so far in `layer`.
    #[must_use]
    pub fn layer(mut self, layer: Box<dyn Middleware>) -> Self {
        self.layers.insert(0, layer);
        self
    }

    /// Layer names and configuration, outermost first, with the raw provider last.
    #[must_use]
    pub fn describe(&self) -> Vec<(String, serde_json::Value)> {
        let mut out: Vec<(String, serde_json::Value)> = self
            .layers
            .iter()
            .map(|l| (l.name().to_string(), l.config_json()))
            .collect();
        out.push((
            "RawProvider".to_string(),
            json!({ "name": self.raw.name() }),
        ));
        out
    }

    /// Build the wrapped provider, applying layers innermost first.
    #[must_use]
    pub fn build(self) -> Arc<dyn FetchWindow> {
        let mut acc: Arc<dyn FetchWindow> = Arc::clone(&self.raw);
        for m in self.layers.into_iter().rev() {
            acc = m.apply(acc);
        }
        acc
    }
}
