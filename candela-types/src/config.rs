//! Configuration types shared by the orchestrator, middleware and binary.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the delay between retry attempts is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum BackoffKind {
    /// Re-issue the identical request immediately.
    #[default]
    Immediate,
    /// Exponential delay with random jitter, bounded by `max_backoff_ms`.
    Exponential,
}

/// Backoff configuration for re-issuing failed provider requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Strategy selector.
    pub kind: BackoffKind,
    /// Delay before the first retry in milliseconds.
    pub min_backoff_ms: u64,
    /// Maximum delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor applied after each failure (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            kind: BackoffKind::Immediate,
            min_backoff_ms: 500,
            max_backoff_ms: 30_000,
            factor: 2,
            jitter_percent: 20,
        }
    }
}

/// Strategy for consuming a request quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum QuotaConsumptionStrategy {
    /// Any call may use any remaining unit of the window.
    #[default]
    Unit,
    /// The window is divided into 24 slices, each with an equal share of the limit.
    EvenSpread,
}

/// Client-side request budget over a fixed window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Maximum number of calls within a single window.
    pub limit: u64,
    /// Length of the accounting window in milliseconds.
    pub window_ms: u64,
    /// How calls consume the budget.
    pub strategy: QuotaConsumptionStrategy,
}

impl QuotaConfig {
    /// Accounting window as a `Duration`.
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            limit: 1200,
            window_ms: 60_000,
            strategy: QuotaConsumptionStrategy::Unit,
        }
    }
}

/// Runtime knobs for the fetch pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Ceiling on provider requests in flight across all jobs.
    pub max_in_flight: usize,
    /// Total attempts per window (first try included).
    pub max_attempts: u32,
    /// Number of jobs whose pipelines may run at the same time.
    pub job_concurrency: usize,
    /// Optional timeout applied to each provider call.
    pub provider_timeout_ms: Option<u64>,
    /// Delay policy between attempts.
    pub backoff: BackoffConfig,
    /// Continue from data already held by the sink instead of re-downloading.
    pub resume: bool,
}

impl FetchConfig {
    /// Per-call timeout as a `Duration`, if configured.
    #[must_use]
    pub fn provider_timeout(&self) -> Option<Duration> {
        self.provider_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 5,
            max_attempts: 3,
            job_concurrency: 1,
            provider_timeout_ms: None,
            backoff: BackoffConfig::default(),
            resume: false,
        }
    }
}

/// What a run downloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    /// Full history from `start_date` to now for every symbol and timeframe.
    #[default]
    History,
    /// Only the most recent provider-limit candles per symbol, first timeframe only.
    Snapshot,
}

/// Static configuration describing one download run.
///
/// `provider_limits` and `timeframe_ms` are merged over the built-in tables
/// ([`default_provider_limits`], [`default_timeframe_ms`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Provider name, used for the limit lookup and the output path.
    pub provider: String,
    /// Symbols to download, e.g. `BTC/USDT`.
    pub symbols: Vec<String>,
    /// Timeframe labels, e.g. `1h`.
    pub timeframes: Vec<String>,
    /// Start date in `DD-MM-YYYY`, interpreted as UTC midnight.
    pub start_date: String,
    /// Root directory of the persisted files.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    /// Run mode.
    #[serde(default)]
    pub mode: DownloadMode,
    /// Provider name -> candles per request overrides.
    #[serde(default)]
    pub provider_limits: BTreeMap<String, u32>,
    /// Timeframe label -> duration in milliseconds overrides.
    #[serde(default)]
    pub timeframe_ms: BTreeMap<String, i64>,
    /// Pipeline knobs.
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Optional client-side request quota.
    #[serde(default)]
    pub quota: Option<QuotaConfig>,
}

fn default_output_dir() -> String {
    "./database".to_string()
}

impl DownloadConfig {
    /// Candles per request for the configured provider, after overrides.
    #[must_use]
    pub fn provider_limit(&self) -> Option<u32> {
        self.provider_limits
            .get(&self.provider)
            .copied()
            .or_else(|| default_provider_limits().get(self.provider.as_str()).copied())
    }

    /// Duration in milliseconds of a timeframe label, after overrides.
    #[must_use]
    pub fn timeframe_duration(&self, timeframe: &str) -> Option<i64> {
        self.timeframe_ms
            .get(timeframe)
            .copied()
            .or_else(|| default_timeframe_ms().get(timeframe).copied())
    }
}

/// Candles-per-request table of the supported providers.
#[must_use]
pub fn default_provider_limits() -> BTreeMap<&'static str, u32> {
    BTreeMap::from([
        ("binance", 1000),
        ("binanceusdm", 1000),
        ("bitfinex", 10_000),
        ("bitget", 1000),
        ("hitbtc", 1000),
        ("kucoin", 1500),
    ])
}

/// Timeframe label -> milliseconds table.
#[must_use]
pub fn default_timeframe_ms() -> BTreeMap<&'static str, i64> {
    BTreeMap::from([
        ("1m", 60_000),
        ("2m", 120_000),
        ("5m", 300_000),
        ("15m", 900_000),
        ("30m", 1_800_000),
        ("1h", 3_600_000),
        ("2h", 7_200_000),
        ("4h", 14_400_000),
        ("12h", 43_200_000),
        ("1d", 86_400_000),
        ("1w", 604_800_000),
        ("1M", 2_629_746_000),
    ])
}
