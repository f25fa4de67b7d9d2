//! Re-export of the shared data types from `candela-types`.
// Consolidated re-exports so downstream crates can depend on `candela-core` only

pub use candela_types::{Candle, CandelaError, FetchResult, Job, Window};

pub use candela_types::{
    BackoffConfig, BackoffKind, DownloadConfig, DownloadMode, FetchConfig, QuotaConfig,
    QuotaConsumptionStrategy, default_provider_limits, default_timeframe_ms,
};

pub use candela_types::{Gap, JobOutcome, JobReport, ProgressSnapshot, RunReport};

pub use rust_decimal::Decimal;
