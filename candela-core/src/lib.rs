//! candela-core
//!
//! Core types, traits, and utilities shared across the candela workspace.
//!
//! - `types`: common data structures (candles, windows, jobs, reports).
//! - `connector`: the `FetchWindow` provider trait and the `Sink` persistence trait.
//! - `timeseries`: window planning, merging, and gap detection.
//! - `backoff`: delay policies between retry attempts.
//!
//! Async runtime (Tokio)
//! ---------------------
//! The traits are runtime-agnostic `async_trait` traits, but the orchestrator
//! and middleware crates assume a Tokio 1.x runtime.
#![warn(missing_docs)]

/// Delay strategies between attempts of the same request.
pub mod backoff;
/// Provider and sink traits.
pub mod connector;
/// Configuration-to-job expansion.
pub mod jobs;
/// Middleware trait implemented by provider wrappers.
pub mod middleware;
/// Date and timestamp helpers.
pub mod time;
/// Time-series utilities for planning and merging.
pub mod timeseries;
/// Re-exported domain types.
pub mod types;

pub use backoff::{BackoffStrategy, ExponentialBackoff, Immediate};
pub use connector::{FetchWindow, Sink};
pub use middleware::Middleware;
pub use timeseries::Series;
pub use timeseries::infer::{estimate_step_ms, find_gaps};
pub use timeseries::merge::{MergedSeries, merge_fetch_results, merge_onto_stored, merge_series};
pub use timeseries::planner::{plan, plan_windows};
pub use types::*;
