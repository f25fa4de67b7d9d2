use crate::timeseries::series::Series;
use crate::{Candle, CandelaError, FetchResult, Window};

/// Merge candle batches into a validated series.
///
/// - Batches are concatenated in the order given.
/// - Candles are stably sorted by `ts`; for equal timestamps the first one
///   encountered wins and later duplicates are dropped.
/// - The result is validated by [`Series::try_new`].
///
/// # Errors
/// Returns `EmptySeries` when no candle survives, `CorruptSeries` when a
/// malformed candle is present.
pub fn merge_series<I>(symbol: &str, timeframe: &str, batches: I) -> Result<Series, CandelaError>
where
    I: IntoIterator<Item = Vec<Candle>>,
{
    let mut candles: Vec<Candle> = batches.into_iter().flatten().collect();
    // Stable: equal timestamps keep their pre-sort relative order.
    candles.sort_by_key(|c| c.ts);
    candles.dedup_by_key(|c| c.ts);
    Series::try_new(symbol, timeframe, candles)
}

/// A merged series together with the windows that contributed nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergedSeries {
    /// Finalized series.
    pub series: Series,
    /// Windows whose attempts were all exhausted, in window order.
    pub failed: Vec<Window>,
}

/// Merge scheduler results for one job.
///
/// Results are first restored to window order, so "first encountered" means
/// "from the earliest window" regardless of the order in which requests
/// completed. Failed windows are returned alongside the series rather than
/// aborting the merge.
///
/// # Errors
/// Same as [`merge_series`]; in particular `EmptySeries` when every window
/// failed or returned no candles.
pub fn merge_fetch_results(
    symbol: &str,
    timeframe: &str,
    results: Vec<FetchResult>,
) -> Result<MergedSeries, CandelaError> {
    merge_onto_stored(symbol, timeframe, results, None)
}

/// Like [`merge_fetch_results`], with a previously persisted series appended
/// after the fresh batches.
///
/// Fresh candles win over stored ones at equal timestamps, so a candle that
/// was still open when it was stored gets refreshed. A stored series keeps
/// the result non-empty even when every fresh window failed.
///
/// # Errors
/// Same as [`merge_series`].
pub fn merge_onto_stored(
    symbol: &str,
    timeframe: &str,
    mut results: Vec<FetchResult>,
    stored: Option<Series>,
) -> Result<MergedSeries, CandelaError> {
    results.sort_by_key(|r| r.window().index);

    let mut failed: Vec<Window> = Vec::new();
    let mut batches: Vec<Vec<Candle>> = Vec::with_capacity(results.len() + 1);
    for r in results {
        match r {
            FetchResult::Success { candles, .. } => batches.push(candles),
            FetchResult::Failure { window, reason } => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    symbol,
                    timeframe,
                    since = window.start,
                    error = %reason,
                    "window permanently missing from series"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = reason;
                failed.push(window);
            }
        }
    }
    if let Some(stored) = stored {
        batches.push(stored.into_candles());
    }

    let series = merge_series(symbol, timeframe, batches)?;
    Ok(MergedSeries { series, failed })
}
