//! Per-call timeout wrapper.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use candela_core::{Candle, CandelaError, FetchWindow, Middleware};

/// Bounds every provider call; an elapsed call becomes `ProviderTimeout`.
pub struct TimeoutProvider {
    inner: Arc<dyn FetchWindow>,
    timeout: Duration,
}

impl TimeoutProvider {
    /// Wrap `inner` so each call is abandoned after `timeout`.
    pub fn new(inner: Arc<dyn FetchWindow>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Configured per-call timeout.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl FetchWindow for TimeoutProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch_window(
        &self,
        symbol: &str,
        timeframe: &str,
        since: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, CandelaError> {
        match tokio::time::timeout(
            self.timeout,
            self.inner.fetch_window(symbol, timeframe, since, limit),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    provider = self.inner.name(),
                    symbol,
                    timeframe,
                    since,
                    timeout_ms = self.timeout.as_millis(),
                    "provider call timed out"
                );
                Err(CandelaError::provider_timeout(self.inner.name()))
            }
        }
    }
}

/// Middleware config for constructing a [`TimeoutProvider`].
pub struct TimeoutMiddleware {
    /// Deadline for each call to the wrapped provider.
    pub timeout: Duration,
}

impl TimeoutMiddleware {
    /// Layer bounding every call by `timeout`.
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Middleware for TimeoutMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn FetchWindow>) -> Arc<dyn FetchWindow> {
        Arc::new(TimeoutProvider::new(inner, self.timeout))
    }

    fn name(&self) -> &'static str {
        "TimeoutProvider"
    }

    fn config_json(&self) -> serde_json::Value {
        serde_json::json!({ "timeout_ms": u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX) })
    }
}
