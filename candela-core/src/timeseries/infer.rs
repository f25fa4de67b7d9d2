use crate::timeseries::series::Series;
use crate::{Candle, Gap};

/// Estimate a representative step (in milliseconds) from positive adjacent
/// timestamp deltas in the input.
///
/// Prefer the mode (most frequent positive delta); if there is no unique mode,
/// return the lower median.
///
/// ```
/// use candela_core::{Candle, Decimal, estimate_step_ms};
///
/// let mk = |ts: i64| Candle::new(ts, Decimal::ONE, Decimal::ONE, Decimal::ONE, Decimal::ONE, Decimal::ZERO);
/// // Adjacent deltas: 60,60,60,120,180  => unique mode is 60
/// let candles = vec![mk(0), mk(60), mk(120), mk(180), mk(300), mk(480)];
/// assert_eq!(estimate_step_ms(&candles), Some(60));
/// ```
///
/// The input order does not matter; duplicates are ignored. Returns `None` if
/// fewer than two distinct timestamps are present.
#[must_use]
pub fn estimate_step_ms(candles: &[Candle]) -> Option<i64> {
    let mut ts: Vec<i64> = candles.iter().map(|c| c.ts).collect();
    ts.sort_unstable();
    ts.dedup();
    if ts.len() < 2 {
        return None;
    }

    let mut deltas: Vec<i64> = ts.windows(2).map(|w| w[1] - w[0]).collect();
    deltas.sort_unstable();

    let mut best_delta = deltas[0];
    let mut best_count = 0usize;
    let mut num_best = 0usize;
    let mut i = 0;
    while i < deltas.len() {
        let d = deltas[i];
        let run = deltas[i..].iter().take_while(|&&x| x == d).count();
        if run > best_count {
            best_count = run;
            best_delta = d;
            num_best = 1;
        } else if run == best_count {
            num_best += 1;
        }
        i += run;
    }
    if num_best == 1 {
        return Some(best_delta);
    }

    // Lower median
    let mid = deltas.len() / 2;
    if deltas.len() % 2 == 1 {
        Some(deltas[mid])
    } else {
        Some(deltas[mid - 1])
    }
}

/// Report holes in a series whose nominal cadence is `step_ms`.
///
/// A gap is any adjacent pair with at least one whole candle missing in
/// between; spacing below two steps is treated as jitter. Returns an empty vector for a
/// non-positive step.
#[must_use]
pub fn find_gaps(series: &Series, step_ms: i64) -> Vec<Gap> {
    if step_ms <= 0 {
        return Vec::new();
    }
    series
        .candles()
        .windows(2)
        .filter_map(|w| {
            let delta = w[1].ts - w[0].ts;
            let missing = delta / step_ms - 1;
            (missing > 0).then(|| Gap {
                after: w[0].ts,
                before: w[1].ts,
                missing: u64::try_from(missing).unwrap_or(u64::MAX),
            })
        })
        .collect()
}
