// Shared fixtures; each test binary uses a different subset.
#![allow(dead_code)]

use std::sync::Arc;

use candela::{Candela, CandelaBuilder};
use candela_core::{Candle, CandelaError, FetchWindow, Job, JobOutcome, JobReport};
use candela_mock::{MemorySink, MockProvider};

pub const MINUTE: i64 = 60_000;
pub const HOUR: i64 = 3_600_000;
/// 01-06-2017 00:00 UTC.
pub const JUNE_2017: i64 = 1_496_275_200_000;

pub const BTC: &str = "BTC/USDT";
pub const ETH: &str = "ETH/USDT";
pub const FAIL: &str = "FAIL/USDT";
pub const SLOW: &str = "SLOW/USDT";

/// Builder with a fixed clock at `now`, the given provider and sink.
pub fn builder(provider: Arc<dyn FetchWindow>, sink: &MemorySink, now: i64) -> CandelaBuilder {
    Candela::builder()
        .with_provider(provider)
        .with_sink(Arc::new(sink.clone()))
        .clock(Arc::new(move || now))
}

/// Hourly mock listed on 01-06-2017 and trading until `until`.
pub fn hourly_mock(until: i64) -> MockProvider {
    MockProvider::new("mock", until).listed_from(JUNE_2017)
}

pub fn hourly_job(symbol: &str, start: i64, limit: u32) -> Job {
    Job::new(symbol, "1h", start, limit, HOUR)
}

/// The candles the hourly mock serves for `[from, to)`.
pub fn hourly_candles(from: i64, to: i64) -> Vec<Candle> {
    (from..to)
        .step_by(usize::try_from(HOUR).unwrap())
        .map(|ts| MockProvider::candle_at(ts, (ts - JUNE_2017) / HOUR))
        .collect()
}

pub fn records(report: &JobReport) -> usize {
    match &report.outcome {
        JobOutcome::Success { records, .. } => *records,
        JobOutcome::Failure { reason } => panic!("job failed: {reason}"),
    }
}

pub fn failure(report: &JobReport) -> &CandelaError {
    match &report.outcome {
        JobOutcome::Failure { reason } => reason,
        JobOutcome::Success { .. } => panic!("job unexpectedly succeeded"),
    }
}
