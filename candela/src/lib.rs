//! Candela downloads historical OHLCV candles from a rate-limited provider.
//!
//! Overview
//! - Splits each `(symbol, timeframe)` job into provider-sized request windows.
//! - Fetches windows concurrently under one request budget shared by all jobs,
//!   re-issuing failed requests up to a fixed attempt count.
//! - Merges the batches into a strictly increasing series (first candle wins on
//!   duplicate timestamps) and hands it to a [`Sink`](candela_core::Sink).
//! - Contains failures: an exhausted window becomes a gap, a failed job becomes
//!   an entry in the [`RunReport`](candela_core::RunReport).
//!
//! Key behaviors and trade-offs
//! - Retries re-issue the identical request. Immediate re-issue is the default;
//!   exponential backoff with jitter is available through
//!   [`CandelaBuilder::backoff`].
//! - "Now" is sampled once per job, so a job's plan never grows while it runs.
//! - Job concurrency overlaps pipelines but never raises the request ceiling.
//!
//! Examples
//! ```rust,ignore
//! use std::sync::Arc;
//! use candela::Candela;
//! use candela_core::jobs::build_jobs;
//!
//! let candela = Candela::builder()
//!     .with_provider(provider)
//!     .with_sink(Arc::new(CsvSink::new("./database", "binance")))
//!     .fetch_config(cfg.fetch.clone())
//!     .build()?;
//! let report = candela.run_all(build_jobs(&cfg)?).await?;
//! eprintln!("{}", report.summary());
//! ```
#![warn(missing_docs)]

pub(crate) mod core;
/// Batch and single-job pipelines.
pub mod download;
/// Window fetching with bounded retries.
pub mod fetcher;
/// Shared progress counters.
pub mod progress;
/// Concurrent dispatch of a job's windows.
pub mod scheduler;

pub use crate::core::{Candela, CandelaBuilder, Clock};
pub use download::DownloadBuilder;
pub use fetcher::{CandleFetcher, retry};
pub use progress::ProgressTracker;
pub use scheduler::RequestScheduler;
pub use tokio_util::sync::CancellationToken;
