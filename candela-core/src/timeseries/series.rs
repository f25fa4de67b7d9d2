use crate::{Candle, CandelaError};

/// A finalized candle series: non-empty, strictly increasing by timestamp,
/// and made only of sane candles.
///
/// The only way to obtain a `Series` is through [`Series::try_new`], so every
/// value handed to a sink upholds these invariants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Series {
    candles: Vec<Candle>,
}

impl Series {
    /// Validate `candles` and wrap them.
    ///
    /// `symbol` and `timeframe` only label the error.
    ///
    /// # Errors
    /// - `EmptySeries` if `candles` is empty.
    /// - `CorruptSeries` if timestamps are not strictly increasing or a candle
    ///   is malformed (`low > high`, open/close outside the range, negative volume).
    pub fn try_new(
        symbol: &str,
        timeframe: &str,
        candles: Vec<Candle>,
    ) -> Result<Self, CandelaError> {
        if candles.is_empty() {
            return Err(CandelaError::empty_series(symbol, timeframe));
        }
        for pair in candles.windows(2) {
            if pair[0].ts >= pair[1].ts {
                return Err(CandelaError::corrupt_series(
                    symbol,
                    timeframe,
                    format!(
                        "timestamps not strictly increasing: {} then {}",
                        pair[0].ts, pair[1].ts
                    ),
                ));
            }
        }
        if let Some(bad) = candles.iter().find(|c| !c.is_sane()) {
            return Err(CandelaError::corrupt_series(
                symbol,
                timeframe,
                format!("malformed candle at {}", bad.ts),
            ));
        }
        Ok(Self { candles })
    }

    /// Candles in timestamp order.
    #[must_use]
    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Consume the series and return its candles.
    #[must_use]
    pub fn into_candles(self) -> Vec<Candle> {
        self.candles
    }

    /// Number of candles (always at least one).
    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    /// Always false; present for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Earliest candle.
    #[must_use]
    pub fn first(&self) -> &Candle {
        &self.candles[0]
    }

    /// Latest candle.
    #[must_use]
    pub fn last(&self) -> &Candle {
        &self.candles[self.candles.len() - 1]
    }

    /// Iterate candles in timestamp order.
    pub fn iter(&self) -> std::slice::Iter<'_, Candle> {
        self.candles.iter()
    }
}

impl<'a> IntoIterator for &'a Series {
    type Item = &'a Candle;
    type IntoIter = std::slice::Iter<'a, Candle>;

    fn into_iter(self) -> Self::IntoIter {
        self.candles.iter()
    }
}
