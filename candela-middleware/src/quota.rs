//! Quota-aware provider wrapper.
//!
//! Unlike a hard limiter, an exhausted budget does not fail the call: the
//! wrapper sleeps until the next slice or window boundary and tries again.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use candela_core::{
    Candle, CandelaError, FetchWindow, Middleware, QuotaConfig, QuotaConsumptionStrategy,
};
use tokio::time::Instant;

/// Number of slices the window is divided into under `EvenSpread`.
const SLICES: u64 = 24;

/// Wrapper that enforces a client-side request quota.
pub struct QuotaAwareProvider {
    inner: Arc<dyn FetchWindow>,
    config: QuotaConfig,
    runtime: Mutex<QuotaRuntime>,
}

struct QuotaRuntime {
    limit: u64,
    calls_made_in_window: u64,
    last_reset: Instant,
    window: Duration,

    allowed_per_slice: u64,
    slice_duration: Duration,
    calls_made_in_slice: u64,
    slice_start: Instant,
    strategy: QuotaConsumptionStrategy,
}

impl QuotaAwareProvider {
    /// Create a new quota-aware wrapper around an existing provider.
    pub fn new(inner: Arc<dyn FetchWindow>, config: QuotaConfig) -> Self {
        let window = config.window();
        let limit = config.limit;
        let strategy = config.strategy;
        let (allowed_per_slice, slice_duration) = match strategy {
            QuotaConsumptionStrategy::EvenSpread => {
                let per_slice = std::cmp::max(1, limit / SLICES);
                let slice_ms = std::cmp::max(1, config.window_ms / SLICES);
                (per_slice, Duration::from_millis(slice_ms))
            }
            _ => (0, Duration::ZERO),
        };
        let now = Instant::now();

        Self {
            inner,
            config,
            runtime: Mutex::new(QuotaRuntime {
                limit,
                calls_made_in_window: 0,
                last_reset: now,
                window,

                allowed_per_slice,
                slice_duration,
                calls_made_in_slice: 0,
                slice_start: now,
                strategy,
            }),
        }
    }

    /// Access the inner provider.
    pub fn inner(&self) -> &Arc<dyn FetchWindow> {
        &self.inner
    }

    /// Configuration this wrapper enforces.
    pub const fn config(&self) -> &QuotaConfig {
        &self.config
    }

    /// Try to consume one unit of the budget without waiting.
    ///
    /// # Errors
    /// Returns `CandelaError::QuotaExceeded` when the per-slice (for
    /// `EvenSpread`) or the overall window budget is exhausted. `reset_in_ms`
    /// is the time until the boundary that frees budget again.
    pub fn should_allow_call(&self) -> Result<(), CandelaError> {
        let mut rt = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        if rt.window.is_zero() {
            return Ok(());
        }

        // Keep window starts aligned to regular boundaries even after idle periods.
        let elapsed = now.duration_since(rt.last_reset);
        if elapsed >= rt.window {
            rt.calls_made_in_window = 0;
            let offset = aligned_offset(elapsed, rt.window);
            rt.last_reset += offset;
        }

        if matches!(rt.strategy, QuotaConsumptionStrategy::EvenSpread) {
            let elapsed = now.duration_since(rt.slice_start);
            if elapsed >= rt.slice_duration {
                rt.calls_made_in_slice = 0;
                let offset = aligned_offset(elapsed, rt.slice_duration);
                rt.slice_start += offset;
            }

            if rt.calls_made_in_slice >= rt.allowed_per_slice && rt.calls_made_in_window < rt.limit
            {
                let elapsed_in_slice = now.duration_since(rt.slice_start);
                return Err(CandelaError::QuotaExceeded {
                    remaining: rt.limit.saturating_sub(rt.calls_made_in_window),
                    reset_in_ms: millis(rt.slice_duration.saturating_sub(elapsed_in_slice)),
                });
            }
        }

        if rt.calls_made_in_window < rt.limit {
            rt.calls_made_in_window += 1;
            if matches!(rt.strategy, QuotaConsumptionStrategy::EvenSpread) {
                rt.calls_made_in_slice += 1;
            }
            return Ok(());
        }

        let elapsed = now.duration_since(rt.last_reset);
        let err = CandelaError::QuotaExceeded {
            remaining: 0,
            reset_in_ms: millis(rt.window.saturating_sub(elapsed)),
        };
        drop(rt);
        Err(err)
    }

    /// Consume one unit of the budget, sleeping across boundaries until one is available.
    pub async fn acquire(&self) {
        loop {
            match self.should_allow_call() {
                Ok(()) => return,
                Err(CandelaError::QuotaExceeded { reset_in_ms, .. }) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        provider = self.inner.name(),
                        wait_ms = reset_in_ms,
                        "request quota exhausted; waiting"
                    );
                    tokio::time::sleep(Duration::from_millis(reset_in_ms.max(1))).await;
                }
                Err(_) => return,
            }
        }
    }
}

fn aligned_offset(elapsed: Duration, period: Duration) -> Duration {
    let periods_passed = elapsed.as_nanos() / period.as_nanos();
    Duration::from_nanos(
        (periods_passed * period.as_nanos())
            .try_into()
            .unwrap_or(u64::MAX),
    )
}

fn millis(d: Duration) -> u64 {
    d.as_millis().try_into().unwrap_or(u64::MAX)
}

#[async_trait]
impl FetchWindow for QuotaAwareProvider {
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
        self.acquire().await;
        self.inner.fetch_window(symbol, timeframe, since, limit).await
    }
}

/// Middleware config for constructing a [`QuotaAwareProvider`].
pub struct QuotaMiddleware {
    /// Quota enforced by the wrapper this layer builds.
    pub config: QuotaConfig,
}

impl QuotaMiddleware {
    /// Layer enforcing `config`.
    #[must_use]
    pub const fn new(config: QuotaConfig) -> Self {
        Self { config }
    }
}

impl Middleware for QuotaMiddleware {
    fn apply(self: Box<Self>, inner: Arc<dyn FetchWindow>) -> Arc<dyn FetchWindow> {
        Arc::new(QuotaAwareProvider::new(inner, self.config))
    }

    fn name(&self) -> &'static str {
        "QuotaAwareProvider"
    }

    fn config_json(&self) -> serde_json::Value {
        let strategy = match self.config.strategy {
            QuotaConsumptionStrategy::EvenSpread => "EvenSpread",
            _ => "Unit",
        };
        serde_json::json!({
            "limit": self.config.limit,
            "window_ms": self.config.window_ms,
            "strategy": strategy,
        })
    }
}
