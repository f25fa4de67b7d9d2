//! Report envelopes produced by the orchestrator.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::error::CandelaError;

/// A run of missing candles between two consecutive stored candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gap {
    /// Timestamp of the last candle before the gap.
    pub after: i64,
    /// Timestamp of the first candle after the gap.
    pub before: i64,
    /// Number of candles missing between `after` and `before`.
    pub missing: u64,
}

/// Terminal state of one job pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobOutcome {
    /// The series was merged and handed to the sink.
    Success {
        /// Number of candles persisted.
        records: usize,
        /// Timestamp of the first persisted candle.
        first_ts: i64,
    },
    /// The job failed; sibling jobs are unaffected.
    Failure {
        /// Why the job failed.
        reason: CandelaError,
    },
}

/// Result of one `(symbol, timeframe)` job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    /// Job symbol.
    pub symbol: String,
    /// Job timeframe label.
    pub timeframe: String,
    /// Terminal state.
    pub outcome: JobOutcome,
    /// Start timestamps of windows whose attempts were all exhausted.
    pub failed_windows: Vec<i64>,
    /// Holes detected in the persisted series.
    pub gaps: Vec<Gap>,
}

impl JobReport {
    /// True when the job reached the sink.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, JobOutcome::Success { .. })
    }
}

/// Aggregate of all jobs in one run, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RunReport {
    /// Per-job reports.
    pub jobs: Vec<JobReport>,
}

impl RunReport {
    /// Jobs that reached the sink.
    pub fn succeeded(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|j| j.is_success())
    }

    /// Jobs that failed.
    pub fn failed(&self) -> impl Iterator<Item = &JobReport> {
        self.jobs.iter().filter(|j| !j.is_success())
    }

    /// Human-readable multi-line summary: succeeded pairs first, then failures with reasons.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let ok = self.succeeded().count();
        let _ = writeln!(out, "{ok}/{} jobs succeeded", self.jobs.len());
        for j in self.succeeded() {
            if let JobOutcome::Success { records, .. } = j.outcome {
                let _ = writeln!(
                    out,
                    "  ok     {} {}: {records} candles, {} gaps",
                    j.symbol,
                    j.timeframe,
                    j.gaps.len()
                );
            }
        }
        for j in self.failed() {
            if let JobOutcome::Failure { reason } = &j.outcome {
                let _ = writeln!(out, "  failed {} {}: {reason}", j.symbol, j.timeframe);
            }
        }
        out
    }
}

/// Coarse progress of a run, published as requests and jobs complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProgressSnapshot {
    /// Jobs finished (either outcome).
    pub jobs_done: usize,
    /// Jobs submitted.
    pub jobs_total: usize,
    /// Window requests finished (either outcome).
    pub requests_done: usize,
    /// Window requests submitted.
    pub requests_total: usize,
    /// Candles received so far, before dedup.
    pub candles: usize,
}
