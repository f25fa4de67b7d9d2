//! One bounded provider call per window, with a fixed attempt budget.

use std::sync::Arc;

use candela_core::{BackoffStrategy, CandelaError, Candle, FetchResult, FetchWindow, Window};
use tokio::sync::Semaphore;

/// Run `op` until it succeeds, fails with a non-retryable error, or has been
/// tried `max_attempts` times (at least once).
///
/// `op` receives the 1-based attempt number. Between attempts the task sleeps
/// for `backoff.delay(failures_so_far)`; a zero delay re-issues immediately.
///
/// # Errors
/// The error of the last attempt.
pub async fn retry<T, F, Fut>(
    max_attempts: u32,
    backoff: &dyn BackoffStrategy,
    mut op: F,
) -> Result<T, CandelaError>
where
    F: FnMut(u32) -> Fut,
    Fut: std::future::Future<Output = Result<T, CandelaError>>,
{
    let attempts = max_attempts.max(1);
    let mut failures = 0;
    loop {
        match op(failures + 1).await {
            Ok(v) => return Ok(v),
            Err(e) => {
                failures += 1;
                if failures >= attempts || !e.is_retryable() {
                    return Err(e);
                }
                let delay = backoff.delay(failures);
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    attempt = failures,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "retrying window"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Issues window requests against a provider, retrying transient failures.
///
/// When a request budget is attached, every attempt holds one permit for the
/// duration of the provider call only; backoff sleeps do not occupy the budget.
/// Waits inside a quota-aware provider are part of the call and keep the permit.
#[derive(Clone)]
pub struct CandleFetcher {
    provider: Arc<dyn FetchWindow>,
    max_attempts: u32,
    backoff: Arc<dyn BackoffStrategy>,
    budget: Option<Arc<Semaphore>>,
}

impl CandleFetcher {
    /// Fetcher without a shared request budget.
    #[must_use]
    pub fn new(
        provider: Arc<dyn FetchWindow>,
        max_attempts: u32,
        backoff: Arc<dyn BackoffStrategy>,
    ) -> Self {
        Self {
            provider,
            max_attempts,
            backoff,
            budget: None,
        }
    }

    /// Gate every attempt on a permit from `budget`.
    #[must_use]
    pub fn with_budget(mut self, budget: Arc<Semaphore>) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Name of the underlying provider.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Fetch one window. Never fails: exhausted attempts become
    /// [`FetchResult::Failure`] carrying the last error.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::fetcher::fetch",
            skip(self),
            fields(provider = self.provider.name(), since = window.start, limit = window.limit),
        )
    )]
    pub async fn fetch(&self, symbol: &str, timeframe: &str, window: Window) -> FetchResult {
        let outcome = retry(self.max_attempts, self.backoff.as_ref(), |_attempt| {
            self.attempt(symbol, timeframe, window)
        })
        .await;
        match outcome {
            Ok(candles) => FetchResult::Success { window, candles },
            Err(reason) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    symbol,
                    timeframe,
                    since = window.start,
                    error = %reason,
                    "window failed after all attempts"
                );
                FetchResult::Failure { window, reason }
            }
        }
    }

    async fn attempt(
        &self,
        symbol: &str,
        timeframe: &str,
        window: Window,
    ) -> Result<Vec<Candle>, CandelaError> {
        let _permit = match &self.budget {
            Some(budget) => Some(
                budget
                    .acquire()
                    .await
                    .map_err(|_| CandelaError::Cancelled)?,
            ),
            None => None,
        };
        self.provider
            .fetch_window(symbol, timeframe, window.start, window.limit)
            .await
    }
}
