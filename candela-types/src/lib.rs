//! Candela-specific data transfer objects and configuration primitives.
#![warn(missing_docs)]

mod candle;
mod config;
mod error;
mod reports;

pub use candle::{Candle, FetchResult, Job, Window};
pub use config::{
    BackoffConfig, BackoffKind, DownloadConfig, DownloadMode, FetchConfig, QuotaConfig,
    QuotaConsumptionStrategy, default_provider_limits, default_timeframe_ms,
};
pub use error::CandelaError;
pub use reports::{Gap, JobOutcome, JobReport, ProgressSnapshot, RunReport};
