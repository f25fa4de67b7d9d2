use async_trait::async_trait;

use crate::timeseries::series::Series;
use crate::{Candle, CandelaError};

/// Role trait for market-data providers that serve bounded OHLCV windows.
///
/// One call returns up to `limit` candles whose timestamps start at or after
/// `since`. Providers may return fewer candles than requested (end of data,
/// listing date) and may return candles that overlap neighbouring windows;
/// deduplication is the merger's job, not the provider's.
#[async_trait]
pub trait FetchWindow: Send + Sync {
    /// Stable provider name used in logs, errors and output paths.
    fn name(&self) -> &'static str;

    /// Fetch one window of candles.
    ///
    /// # Errors
    /// Returns `CandelaError::Provider` on transport or API failure.
    async fn fetch_window(
        &self,
        symbol: &str,
        timeframe: &str,
        since: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, CandelaError>;
}

/// Role trait for persistence targets receiving finalized series.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Persist the series of a `(symbol, timeframe)` pair, replacing any previous copy.
    ///
    /// # Errors
    /// Returns `CandelaError::Persistence` on I/O failure.
    async fn write(&self, symbol: &str, timeframe: &str, series: &Series)
    -> Result<(), CandelaError>;

    /// Load a previously persisted series, if any.
    ///
    /// Used for incremental downloads. The default reports nothing stored.
    ///
    /// # Errors
    /// Returns `CandelaError::Persistence` if stored data exists but cannot be read.
    async fn load(&self, _symbol: &str, _timeframe: &str) -> Result<Option<Series>, CandelaError> {
        Ok(None)
    }
}
