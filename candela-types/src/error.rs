use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the candela workspace.
///
/// Covers configuration problems, provider-tagged request failures, series
/// integrity failures raised while merging, and persistence failures.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CandelaError {
    /// Malformed static configuration (unknown timeframe, non-positive limit, bad date).
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A single provider request failed at the transport or API level.
    #[error("{provider} failed ({code}): {message}")]
    Provider {
        /// Provider name that failed.
        provider: String,
        /// Provider-specific error code (HTTP status or API code).
        code: i64,
        /// Human-readable error message.
        message: String,
    },

    /// An individual provider call exceeded the configured timeout.
    #[error("provider timed out: {provider}")]
    ProviderTimeout {
        /// Provider name that timed out.
        provider: String,
    },

    /// The request exceeds the configured quota budget for the current window.
    #[error("quota exceeded: remaining={remaining} reset_in_ms={reset_in_ms}")]
    QuotaExceeded {
        /// Remaining units at the time of rejection.
        remaining: u64,
        /// Milliseconds until the quota window resets.
        reset_in_ms: u64,
    },

    /// No usable candle survived fetching and merging.
    #[error("empty series for {symbol} {timeframe}")]
    EmptySeries {
        /// Symbol of the job.
        symbol: String,
        /// Timeframe label of the job.
        timeframe: String,
    },

    /// Merged data could not be made strictly increasing or contained malformed candles.
    #[error("corrupt series for {symbol} {timeframe}: {detail}")]
    CorruptSeries {
        /// Symbol of the job.
        symbol: String,
        /// Timeframe label of the job.
        timeframe: String,
        /// What check failed.
        detail: String,
    },

    /// The sink could not persist or read a series.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// The job was cancelled by its caller before completion.
    #[error("cancelled")]
    Cancelled,
}

impl CandelaError {
    /// Helper: build an `InvalidConfiguration` error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    /// Helper: build a `Provider` error.
    pub fn provider(provider: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            code,
            message: message.into(),
        }
    }

    /// Helper: build a `ProviderTimeout` error.
    pub fn provider_timeout(provider: impl Into<String>) -> Self {
        Self::ProviderTimeout {
            provider: provider.into(),
        }
    }

    /// Helper: build a `Persistence` error from anything displayable.
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    /// Helper: build an `EmptySeries` error.
    pub fn empty_series(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self::EmptySeries {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }

    /// Helper: build a `CorruptSeries` error.
    pub fn corrupt_series(
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::CorruptSeries {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            detail: detail.into(),
        }
    }

    /// Returns true for per-request failures that the fetcher may re-issue.
    ///
    /// Series, persistence and configuration failures are terminal.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Provider { .. } | Self::ProviderTimeout { .. } | Self::QuotaExceeded { .. }
        )
    }

    /// Returns true if this error should abort the whole process rather than a single job.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }
}
