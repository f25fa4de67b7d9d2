use candela_types::{CandelaError, Gap, Job, JobOutcome, JobReport, RunReport};

fn report(symbol: &str, outcome: JobOutcome) -> JobReport {
    JobReport {
        symbol: symbol.to_string(),
        timeframe: "1h".to_string(),
        outcome,
        failed_windows: vec![],
        gaps: vec![],
    }
}

#[test]
fn summary_lists_successes_and_failures_with_reasons() {
    let mut ok = report(
        "BTC/USDT",
        JobOutcome::Success {
            records: 42,
            first_ts: 0,
        },
    );
    ok.gaps.push(Gap {
        after: 0,
        before: 6 * 3_600_000,
        missing: 5,
    });
    let failed = report(
        "ETH/USDT",
        JobOutcome::Failure {
            reason: CandelaError::empty_series("ETH/USDT", "1h"),
        },
    );
    let run = RunReport {
        jobs: vec![ok, failed],
    };

    assert_eq!(run.succeeded().count(), 1);
    assert_eq!(run.failed().count(), 1);
    let text = run.summary();
    assert!(text.starts_with("1/2 jobs succeeded"));
    assert!(text.contains("ok     BTC/USDT 1h: 42 candles, 1 gaps"));
    assert!(text.contains("failed ETH/USDT 1h: empty series for ETH/USDT 1h"));
}

#[test]
fn step_is_limit_times_duration() {
    let job = Job::new("BTC/USDT", "1h", 0, 1000, 3_600_000);
    assert_eq!(job.step_ms().unwrap(), 3_600_000_000);
}

#[test]
fn step_rejects_non_positive_inputs() {
    let zero_limit = Job::new("BTC/USDT", "1h", 0, 0, 3_600_000);
    assert!(matches!(
        zero_limit.step_ms(),
        Err(CandelaError::InvalidConfiguration(_))
    ));
    let negative_tf = Job::new("BTC/USDT", "1h", 0, 10, -1);
    assert!(matches!(
        negative_tf.step_ms(),
        Err(CandelaError::InvalidConfiguration(_))
    ));
}

#[test]
fn only_request_level_errors_are_retryable() {
    assert!(CandelaError::provider("binance", 429, "too many requests").is_retryable());
    assert!(CandelaError::provider_timeout("binance").is_retryable());
    assert!(!CandelaError::Persistence("disk full".into()).is_retryable());
    assert!(!CandelaError::Cancelled.is_retryable());
    assert!(CandelaError::invalid_config("bad").is_fatal());
    assert!(!CandelaError::empty_series("X", "1h").is_fatal());
}
