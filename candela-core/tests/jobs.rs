use candela_core::jobs::build_jobs;
use candela_core::time::{format_ts, parse_start_date, parse_ts};
use candela_core::{CandelaError, DownloadConfig, DownloadMode, FetchConfig};
use std::collections::BTreeMap;

fn config(symbols: &[&str], timeframes: &[&str]) -> DownloadConfig {
    DownloadConfig {
        provider: "binance".into(),
        symbols: symbols.iter().map(|s| (*s).to_string()).collect(),
        timeframes: timeframes.iter().map(|s| (*s).to_string()).collect(),
        start_date: "01-06-2017".into(),
        output_dir: "./database".into(),
        mode: DownloadMode::History,
        provider_limits: BTreeMap::new(),
        timeframe_ms: BTreeMap::new(),
        fetch: FetchConfig::default(),
        quota: None,
    }
}

#[test]
fn jobs_are_timeframe_major() {
    let jobs = build_jobs(&config(&["BTC/USDT", "ETH/USDT"], &["1h", "1d"])).unwrap();
    let labels: Vec<String> = jobs.iter().map(candela_core::Job::label).collect();
    assert_eq!(
        labels,
        vec!["BTC/USDT 1h", "ETH/USDT 1h", "BTC/USDT 1d", "ETH/USDT 1d"]
    );
    assert!(jobs.iter().all(|j| j.start == 1_496_275_200_000));
    assert!(jobs.iter().all(|j| j.provider_limit == 1000));
    assert_eq!(jobs[0].timeframe_ms, 3_600_000);
    assert_eq!(jobs[2].timeframe_ms, 86_400_000);
}

#[test]
fn overrides_take_precedence_over_built_in_tables() {
    let mut cfg = config(&["BTC/USDT"], &["3h"]);
    cfg.provider = "myexchange".into();
    cfg.provider_limits.insert("myexchange".into(), 250);
    cfg.timeframe_ms.insert("3h".into(), 10_800_000);
    let jobs = build_jobs(&cfg).unwrap();
    assert_eq!(jobs[0].provider_limit, 250);
    assert_eq!(jobs[0].step_ms().unwrap(), 250 * 10_800_000);
}

#[test]
fn unknown_provider_or_timeframe_is_rejected() {
    let mut cfg = config(&["BTC/USDT"], &["1h"]);
    cfg.provider = "nowhere".into();
    assert!(matches!(
        build_jobs(&cfg),
        Err(CandelaError::InvalidConfiguration(_))
    ));

    let cfg = config(&["BTC/USDT"], &["7h"]);
    let err = build_jobs(&cfg).unwrap_err();
    assert!(err.to_string().contains("7h"));
}

#[test]
fn zero_limit_and_empty_lists_are_rejected() {
    let mut cfg = config(&["BTC/USDT"], &["1h"]);
    cfg.provider_limits.insert("binance".into(), 0);
    assert!(build_jobs(&cfg).is_err());

    assert!(build_jobs(&config(&[], &["1h"])).is_err());
    assert!(build_jobs(&config(&["BTC/USDT"], &[])).is_err());
    assert!(build_jobs(&config(&["BTC/USDT", "BTC/USDT"], &["1h"])).is_err());
}

#[test]
fn malformed_start_date_is_rejected() {
    let mut cfg = config(&["BTC/USDT"], &["1h"]);
    cfg.start_date = "2017-06-01".into();
    assert!(matches!(
        build_jobs(&cfg),
        Err(CandelaError::InvalidConfiguration(_))
    ));
    assert!(parse_start_date("31-02-2020").is_err());
}

#[test]
fn timestamps_render_and_parse_back() {
    let ts = 1_496_275_200_000 + 3_600_000;
    assert_eq!(format_ts(ts), "2017-06-01 01:00:00");
    assert_eq!(parse_ts("2017-06-01 01:00:00").unwrap(), ts);
    assert_eq!(parse_ts("1496278800000").unwrap(), ts);
    assert!(matches!(
        parse_ts("yesterday"),
        Err(CandelaError::Persistence(_))
    ));
}
