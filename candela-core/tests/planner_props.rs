use candela_core::{CandelaError, Job, plan, plan_windows};
use proptest::prelude::*;

proptest! {
    #[test]
    fn plan_covers_range_in_fixed_steps(
        start in -1_000_000i64..1_000_000,
        span in 0i64..5_000_000,
        step in 1i64..100_000,
    ) {
        let now = start + span;
        let starts = plan(start, now, step).unwrap();

        prop_assert_eq!(starts[0], start);
        for w in starts.windows(2) {
            prop_assert_eq!(w[1] - w[0], step);
        }
        for s in &starts[1..] {
            prop_assert!(*s < now);
        }
        // The next start would not be below now.
        let last = *starts.last().unwrap();
        prop_assert!(last + step >= now);
    }

    #[test]
    fn window_count_matches_ceiling(
        start in 0i64..1_000_000,
        span in 1i64..5_000_000,
        step in 1i64..100_000,
    ) {
        let starts = plan(start, start + span, step).unwrap();
        let expected = usize::try_from((span + step - 1) / step).unwrap();
        prop_assert_eq!(starts.len(), expected);
    }
}

#[test]
fn start_at_or_after_now_still_yields_one_window() {
    assert_eq!(plan(100, 100, 10).unwrap(), vec![100]);
    assert_eq!(plan(500, 100, 10).unwrap(), vec![500]);
}

#[test]
fn non_positive_step_is_invalid_configuration() {
    assert!(matches!(
        plan(0, 100, 0),
        Err(CandelaError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        plan(0, 100, -5),
        Err(CandelaError::InvalidConfiguration(_))
    ));
}

#[test]
fn plan_stops_before_overflow() {
    let starts = plan(i64::MAX - 5, i64::MAX, 10).unwrap();
    assert_eq!(starts, vec![i64::MAX - 5]);
}

#[test]
fn windows_are_indexed_and_carry_the_provider_limit() {
    // 1h candles, 1000 per request: each window spans 1000 hours.
    let job = Job::new("BTC/USDT", "1h", 0, 1000, 3_600_000);
    let now = 2500 * 3_600_000;
    let windows = plan_windows(&job, now).unwrap();
    assert_eq!(windows.len(), 3);
    for (i, w) in windows.iter().enumerate() {
        assert_eq!(w.index, i);
        assert_eq!(w.limit, 1000);
        assert_eq!(w.start, i64::try_from(i).unwrap() * 3_600_000_000);
    }
}

#[test]
fn zero_limit_job_cannot_be_planned() {
    let job = Job::new("BTC/USDT", "1h", 0, 0, 3_600_000);
    assert!(matches!(
        plan_windows(&job, 10),
        Err(CandelaError::InvalidConfiguration(_))
    ));
}
