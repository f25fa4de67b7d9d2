//! Candle, window and job descriptors.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CandelaError;

/// One OHLCV bucket as returned by a provider.
///
/// Identity within a `(symbol, timeframe)` series is `ts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time, milliseconds since the UNIX epoch (UTC).
    pub ts: i64,
    /// Open price.
    pub open: Decimal,
    /// Highest traded price.
    pub high: Decimal,
    /// Lowest traded price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Traded volume in base units.
    pub volume: Decimal,
}

impl Candle {
    /// Build a candle from its components.
    #[must_use]
    pub const fn new(
        ts: i64,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// A candle is sane when `low <= high`, both bound open/close, and volume is non-negative.
    #[must_use]
    pub fn is_sane(&self) -> bool {
        self.low <= self.high
            && self.low <= self.open
            && self.open <= self.high
            && self.low <= self.close
            && self.close <= self.high
            && !self.volume.is_sign_negative()
    }
}

/// One bounded provider request: up to `limit` candles starting at `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    /// Position of this window within its job's plan.
    pub index: usize,
    /// First timestamp requested (`since`), in milliseconds.
    pub start: i64,
    /// Maximum candles requested.
    pub limit: u32,
}

/// One fetch task for a `(symbol, timeframe)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Provider symbol, e.g. `BTC/USDT`.
    pub symbol: String,
    /// Timeframe label, e.g. `1h`.
    pub timeframe: String,
    /// Start of the requested range, milliseconds (UTC).
    pub start: i64,
    /// Maximum candles the provider returns per request.
    pub provider_limit: u32,
    /// Duration of one candle in milliseconds.
    pub timeframe_ms: i64,
}

impl Job {
    /// Build a job descriptor.
    pub fn new(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        start: i64,
        provider_limit: u32,
        timeframe_ms: i64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            start,
            provider_limit,
            timeframe_ms,
        }
    }

    /// Span covered by one request: `provider_limit * timeframe_ms`.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if either factor is non-positive or the
    /// product overflows.
    pub fn step_ms(&self) -> Result<i64, CandelaError> {
        if self.provider_limit == 0 || self.timeframe_ms <= 0 {
            return Err(CandelaError::invalid_config(format!(
                "non-positive step for {} {}: limit={} timeframe_ms={}",
                self.symbol, self.timeframe, self.provider_limit, self.timeframe_ms
            )));
        }
        self.timeframe_ms
            .checked_mul(i64::from(self.provider_limit))
            .ok_or_else(|| {
                CandelaError::invalid_config(format!(
                    "step overflows for {} {}",
                    self.symbol, self.timeframe
                ))
            })
    }

    /// `symbol timeframe` label used in logs and reports.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.symbol, self.timeframe)
    }
}

/// Outcome of fetching one window, tagged with the window it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchResult {
    /// The provider returned a batch (possibly empty).
    Success {
        /// Originating window.
        window: Window,
        /// Candles in provider order.
        candles: Vec<Candle>,
    },
    /// Every attempt failed; the window's candles are missing from the series.
    Failure {
        /// Originating window.
        window: Window,
        /// Error of the last attempt.
        reason: CandelaError,
    },
}

impl FetchResult {
    /// Window this result was produced for.
    #[must_use]
    pub const fn window(&self) -> &Window {
        match self {
            Self::Success { window, .. } | Self::Failure { window, .. } => window,
        }
    }

    /// True for `Success`.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
