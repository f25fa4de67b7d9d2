//! Deterministic providers and sinks for tests and examples.
//!
//! - [`MockProvider`]: synthetic candles on a fixed grid, with optional gaps,
//!   overlapping batches, latency and forced failures.
//! - [`DynamicMockProvider`]: behaviors scripted per window by a controller.
//! - [`MemorySink`]: in-memory persistence.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use candela_core::{Candle, CandelaError, Decimal, FetchWindow, default_timeframe_ms};

mod dynamic;
mod sink;
mod stats;

pub use dynamic::{DynamicMockController, DynamicMockProvider, MockBehavior};
pub use sink::MemorySink;
pub use stats::CallStats;

/// Mock provider serving a synthetic series for every symbol.
///
/// Candles sit on the grid `listed_from + k * timeframe_ms` and stop before
/// `until`. Two symbols have fixed behavior: `FAIL/USDT` always errors and
/// `SLOW/USDT` never answers.
pub struct MockProvider {
    name: &'static str,
    listed_from: i64,
    until: i64,
    gaps: Vec<(i64, i64)>,
    overlap: u32,
    latency: Duration,
    stats: Arc<CallStats>,
}

impl MockProvider {
    /// Mock listed at the epoch and trading until `until`.
    #[must_use]
    pub fn new(name: &'static str, until: i64) -> Self {
        Self {
            name,
            listed_from: 0,
            until,
            gaps: Vec::new(),
            overlap: 0,
            latency: Duration::ZERO,
            stats: Arc::new(CallStats::default()),
        }
    }

    /// First candle timestamp; earlier requests start here.
    #[must_use]
    pub const fn listed_from(mut self, ts: i64) -> Self {
        self.listed_from = ts;
        self
    }

    /// Drop every candle with `from <= ts < to`.
    #[must_use]
    pub fn with_gap(mut self, from: i64, to: i64) -> Self {
        self.gaps.push((from, to));
        self
    }

    /// Return `n` extra candles past the end of each requested window.
    #[must_use]
    pub const fn with_overlap(mut self, n: u32) -> Self {
        self.overlap = n;
        self
    }

    /// Sleep this long inside every call.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Counters for calls made against this provider.
    #[must_use]
    pub fn stats(&self) -> Arc<CallStats> {
        Arc::clone(&self.stats)
    }

    /// The deterministic candle at grid position `k`.
    #[must_use]
    pub fn candle_at(ts: i64, k: i64) -> Candle {
        let base = Decimal::from(100 + k.rem_euclid(50));
        Candle::new(
            ts,
            base,
            base + Decimal::from(2),
            base - Decimal::ONE,
            base + Decimal::ONE,
            Decimal::from(10 + k.rem_euclid(7)),
        )
    }

    fn in_gap(&self, ts: i64) -> bool {
        self.gaps.iter().any(|&(from, to)| from <= ts && ts < to)
    }

    /// Candles a call with these arguments returns, without side effects.
    ///
    /// # Errors
    /// Returns `Provider` for an unknown timeframe label.
    pub fn series_for(
        &self,
        timeframe: &str,
        since: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, CandelaError> {
        let step = default_timeframe_ms()
            .get(timeframe)
            .copied()
            .ok_or_else(|| {
                CandelaError::provider(self.name, 400, format!("unknown timeframe {timeframe}"))
            })?;

        let from = since.max(self.listed_from);
        let mut k = (from - self.listed_from + step - 1) / step;
        let overlap = i64::from(self.overlap);
        let end = since
            .saturating_add(step.saturating_mul(i64::from(limit) + overlap))
            .min(self.until);
        let budget = usize::try_from(limit.saturating_add(self.overlap)).unwrap_or(usize::MAX);

        let mut out = Vec::new();
        let mut ts = self.listed_from + k * step;
        while ts < end && out.len() < budget {
            if !self.in_gap(ts) {
                out.push(Self::candle_at(ts, k));
            }
            k += 1;
            ts = self.listed_from + k * step;
        }
        Ok(out)
    }
}

#[async_trait]
impl FetchWindow for MockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_window(
        &self,
        symbol: &str,
        timeframe: &str,
        since: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, CandelaError> {
        let _guard = self.stats.enter();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match symbol {
            "FAIL/USDT" => Err(CandelaError::provider(
                self.name,
                503,
                format!("forced failure for {symbol}"),
            )),
            "SLOW/USDT" => std::future::pending().await,
            _ => self.series_for(timeframe, since, limit),
        }
    }
}
