//! Time-series utilities used by the orchestrator.
//!
//! Modules include:
//! - `planner`: split a time range into provider-sized request windows
//! - `merge`: merge window batches into one deduplicated, ordered series
//! - `infer`: infer cadence and detect gaps
//! - `series`: the validated `Series` type handed to sinks
/// Cadence inference and gap detection.
pub mod infer;
/// Merge utilities for joining window batches.
pub mod merge;
/// Request window planning.
pub mod planner;
/// The validated series type.
pub mod series;

pub use series::Series;
