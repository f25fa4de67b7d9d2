use candela_core::{
    Candle, CandelaError, Decimal, FetchResult, Series, Window, merge_fetch_results,
    merge_onto_stored, merge_series,
};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn flat(ts: i64, px: i64) -> Candle {
    let p = Decimal::new(px, 2);
    Candle::new(ts, p, p, p, p, Decimal::ONE)
}

fn arb_candle() -> impl Strategy<Value = Candle> {
    (0i64..500, 0i64..100_000).prop_map(|(slot, px)| flat(slot * 60_000, px))
}

fn arb_batches() -> impl Strategy<Value = Vec<Vec<Candle>>> {
    proptest::collection::vec(proptest::collection::vec(arb_candle(), 0..80), 0..6)
}

proptest! {
    #[test]
    fn first_occurrence_wins(batches in arb_batches()) {
        let mut first_by_ts: BTreeMap<i64, Candle> = BTreeMap::new();
        for b in &batches {
            for c in b {
                first_by_ts.entry(c.ts).or_insert_with(|| c.clone());
            }
        }

        match merge_series("BTC/USDT", "1m", batches) {
            Ok(series) => {
                prop_assert_eq!(series.len(), first_by_ts.len());
                for c in series.iter() {
                    prop_assert_eq!(first_by_ts.get(&c.ts), Some(c));
                }
            }
            Err(e) => {
                prop_assert!(first_by_ts.is_empty());
                let is_empty_err = matches!(e, CandelaError::EmptySeries { .. });
                prop_assert!(is_empty_err);
            }
        }
    }

    #[test]
    fn output_strictly_increasing(batches in arb_batches()) {
        if let Ok(series) = merge_series("ETH/USDT", "1m", batches) {
            for w in series.candles().windows(2) {
                prop_assert!(w[0].ts < w[1].ts);
            }
        }
    }

    #[test]
    fn merge_is_idempotent(batches in arb_batches()) {
        if let Ok(once) = merge_series("ETH/USDT", "1m", batches) {
            let twice = merge_series("ETH/USDT", "1m", vec![once.candles().to_vec()]).unwrap();
            prop_assert_eq!(once, twice);
        }
    }

    #[test]
    fn input_order_irrelevant_for_distinct_ts(slots in proptest::collection::btree_set(0i64..1000, 1..100)) {
        let ordered: Vec<Candle> = slots.iter().map(|s| flat(s * 1000, *s)).collect();
        let mut reversed = ordered.clone();
        reversed.reverse();
        let a = merge_series("X", "1s", vec![ordered]).unwrap();
        let b = merge_series("X", "1s", vec![reversed]).unwrap();
        prop_assert_eq!(a, b);
    }
}

#[test]
fn overlapping_windows_keep_earlier_batch() {
    let w0 = vec![flat(0, 1), flat(1, 1), flat(2, 1)];
    let w1 = vec![flat(2, 99), flat(3, 99)];
    let series = merge_series("BTC/USDT", "1h", vec![w0, w1]).unwrap();
    let ts: Vec<i64> = series.iter().map(|c| c.ts).collect();
    assert_eq!(ts, vec![0, 1, 2, 3]);
    assert_eq!(series.candles()[2].close, Decimal::new(1, 2));
}

#[test]
fn empty_input_is_empty_series() {
    let err = merge_series("BTC/USDT", "1h", Vec::<Vec<Candle>>::new()).unwrap_err();
    assert!(matches!(err, CandelaError::EmptySeries { ref symbol, .. } if symbol == "BTC/USDT"));

    let err = merge_series("BTC/USDT", "1h", vec![vec![], vec![]]).unwrap_err();
    assert!(matches!(err, CandelaError::EmptySeries { .. }));
}

#[test]
fn malformed_candle_is_corrupt_series() {
    let mut bad = flat(10, 5);
    bad.low = Decimal::new(10, 0);
    bad.high = Decimal::new(1, 0);
    let err = merge_series("BTC/USDT", "1h", vec![vec![flat(0, 1), bad]]).unwrap_err();
    assert!(matches!(err, CandelaError::CorruptSeries { .. }));
}

#[test]
fn fetch_results_merge_in_window_order_not_completion_order() {
    let win = |index: usize| Window {
        index,
        start: i64::try_from(index).unwrap() * 3,
        limit: 3,
    };
    // Window 1 completed first, and overlaps window 0 at ts=2.
    let results = vec![
        FetchResult::Success {
            window: win(1),
            candles: vec![flat(2, 77), flat(3, 77)],
        },
        FetchResult::Failure {
            window: win(2),
            reason: CandelaError::provider("mock", 500, "boom"),
        },
        FetchResult::Success {
            window: win(0),
            candles: vec![flat(0, 1), flat(1, 1), flat(2, 1)],
        },
    ];
    let merged = merge_fetch_results("BTC/USDT", "1h", results).unwrap();
    assert_eq!(merged.series.len(), 4);
    assert_eq!(merged.series.candles()[2].close, Decimal::new(1, 2));
    assert_eq!(merged.failed, vec![win(2)]);
}

#[test]
fn all_windows_failed_is_empty_series() {
    let results = vec![FetchResult::Failure {
        window: Window {
            index: 0,
            start: 0,
            limit: 10,
        },
        reason: CandelaError::provider_timeout("mock"),
    }];
    let err = merge_fetch_results("BTC/USDT", "1h", results).unwrap_err();
    assert!(matches!(err, CandelaError::EmptySeries { .. }));
}

#[test]
fn fresh_batches_override_stored_tail() {
    let stored = Series::try_new(
        "BTC/USDT",
        "1m",
        vec![flat(0, 1), flat(60_000, 1), flat(120_000, 1)],
    )
    .unwrap();
    let results = vec![FetchResult::Success {
        window: Window {
            index: 0,
            start: 60_000,
            limit: 10,
        },
        candles: vec![flat(60_000, 9), flat(120_000, 9), flat(180_000, 9)],
    }];
    let merged = merge_onto_stored("BTC/USDT", "1m", results, Some(stored)).unwrap();
    let closes: Vec<Decimal> = merged.series.iter().map(|c| c.close).collect();
    assert_eq!(
        closes,
        vec![
            Decimal::new(1, 2),
            Decimal::new(9, 2),
            Decimal::new(9, 2),
            Decimal::new(9, 2)
        ]
    );
}

#[test]
fn stored_series_survives_failed_refresh() {
    let stored = Series::try_new("BTC/USDT", "1m", vec![flat(0, 1)]).unwrap();
    let results = vec![FetchResult::Failure {
        window: Window {
            index: 0,
            start: 0,
            limit: 10,
        },
        reason: CandelaError::provider("mock", 503, "down"),
    }];
    let merged = merge_onto_stored("BTC/USDT", "1m", results, Some(stored)).unwrap();
    assert_eq!(merged.series.len(), 1);
    assert_eq!(merged.failed.len(), 1);
}
