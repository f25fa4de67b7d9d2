//! Job pipelines: plan, fetch, merge, persist.

use std::collections::HashSet;

use candela_core::{
    CandelaError, FetchResult, Gap, Job, JobOutcome, JobReport, RunReport, Series, Window,
    find_gaps, merge_onto_stored, plan_windows,
};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::core::Candela;

/// Builder for running a batch of jobs.
///
/// ```rust,ignore
/// let report = candela
///     .download()
///     .job(Job::new("BTC/USDT", "1h", start, 1000, 3_600_000))
///     .job(Job::new("ETH/USDT", "1h", start, 1000, 3_600_000))
///     .cancel_on(token.clone())
///     .run()
///     .await?;
/// println!("{}", report.summary());
/// ```
pub struct DownloadBuilder<'a> {
    candela: &'a Candela,
    jobs: Vec<Job>,
    cancel: Option<CancellationToken>,
}

impl<'a> DownloadBuilder<'a> {
    /// Create a new builder bound to a `Candela` instance.
    #[must_use]
    pub const fn new(candela: &'a Candela) -> Self {
        Self {
            candela,
            jobs: Vec::new(),
            cancel: None,
        }
    }

    /// Add one job.
    #[must_use]
    pub fn job(mut self, job: Job) -> Self {
        self.jobs.push(job);
        self
    }

    /// Add several jobs, keeping their order.
    #[must_use]
    pub fn jobs<I: IntoIterator<Item = Job>>(mut self, jobs: I) -> Self {
        self.jobs.extend(jobs);
        self
    }

    /// Abandon outstanding work when `token` is cancelled.
    ///
    /// Jobs still running report `Cancelled`; jobs that already finished keep
    /// their outcome.
    #[must_use]
    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run every job and collect one report per job, in submission order.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the same `(symbol, timeframe)` pair
    /// appears twice. Per-job failures never surface here; they are recorded
    /// in the returned [`RunReport`].
    pub async fn run(self) -> Result<RunReport, CandelaError> {
        let mut seen = HashSet::new();
        for job in &self.jobs {
            if !seen.insert((job.symbol.as_str(), job.timeframe.as_str())) {
                return Err(CandelaError::invalid_config(format!(
                    "duplicate job {}",
                    job.label()
                )));
            }
        }

        let cancel = self.cancel.unwrap_or_default();
        let candela = self.candela;
        candela.progress.add_jobs(self.jobs.len());
        #[cfg(feature = "tracing")]
        tracing::info!(
            jobs = self.jobs.len(),
            provider = candela.provider_name(),
            "download started"
        );

        let report = candela
            .run_jobs(&self.jobs, &cancel, candela.resume)
            .await;
        #[cfg(feature = "tracing")]
        tracing::info!(
            succeeded = report.succeeded().count(),
            failed = report.failed().count(),
            "download finished"
        );
        Ok(report)
    }
}

impl Candela {
    /// Start a batch download.
    #[must_use]
    pub const fn download(&self) -> DownloadBuilder<'_> {
        DownloadBuilder::new(self)
    }

    /// Run every job; see [`DownloadBuilder::run`].
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` on duplicate `(symbol, timeframe)` pairs.
    pub async fn run_all(&self, jobs: Vec<Job>) -> Result<RunReport, CandelaError> {
        self.download().jobs(jobs).run().await
    }

    /// Run one job pipeline. Failures are captured in the report.
    pub async fn run_job(&self, job: &Job, cancel: &CancellationToken) -> JobReport {
        self.progress.add_jobs(1);
        self.execute(job, cancel, self.resume).await
    }

    /// Fetch the most recent `limit` candles of each symbol as single-window jobs.
    ///
    /// Stored data is ignored; each series is replaced by the fresh window.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for a non-positive timeframe duration, a
    /// zero limit or duplicate symbols.
    pub async fn snapshot(
        &self,
        symbols: &[String],
        timeframe: &str,
        timeframe_ms: i64,
        limit: u32,
    ) -> Result<RunReport, CandelaError> {
        if timeframe_ms <= 0 || limit == 0 {
            return Err(CandelaError::invalid_config(format!(
                "snapshot needs a positive timeframe and limit, got {timeframe_ms} ms x {limit}"
            )));
        }
        let now = self.now();
        let span = timeframe_ms
            .checked_mul(i64::from(limit))
            .ok_or_else(|| CandelaError::invalid_config("snapshot span overflows"))?;
        let start = now.saturating_sub(span);

        let mut seen = HashSet::new();
        let mut jobs = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if !seen.insert(symbol.as_str()) {
                return Err(CandelaError::invalid_config(format!(
                    "duplicate snapshot symbol {symbol}"
                )));
            }
            jobs.push(Job::new(symbol.clone(), timeframe, start, limit, timeframe_ms));
        }

        self.progress.add_jobs(jobs.len());
        Ok(self
            .run_jobs(&jobs, &CancellationToken::new(), false)
            .await)
    }

    async fn run_jobs(&self, jobs: &[Job], cancel: &CancellationToken, resume: bool) -> RunReport {
        let mut reports: Vec<(usize, JobReport)> = stream::iter(jobs.iter().enumerate())
            .map(|(i, job)| async move { (i, self.execute(job, cancel, resume).await) })
            .buffer_unordered(self.job_concurrency)
            .collect()
            .await;
        reports.sort_by_key(|(i, _)| *i);
        RunReport {
            jobs: reports.into_iter().map(|(_, r)| r).collect(),
        }
    }

    async fn execute(&self, job: &Job, cancel: &CancellationToken, resume: bool) -> JobReport {
        let mut failed_windows = Vec::new();
        let mut gaps = Vec::new();
        let outcome = match self
            .pipeline(job, cancel, resume, &mut failed_windows, &mut gaps)
            .await
        {
            Ok(series) => JobOutcome::Success {
                records: series.len(),
                first_ts: series.first().ts,
            },
            Err(reason) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(job = %job.label(), error = %reason, "job failed");
                JobOutcome::Failure { reason }
            }
        };
        self.progress.job_done();
        JobReport {
            symbol: job.symbol.clone(),
            timeframe: job.timeframe.clone(),
            outcome,
            failed_windows,
            gaps,
        }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::download::pipeline",
            skip(self, cancel, failed_windows, gaps),
            fields(job = %job.label()),
        )
    )]
    async fn pipeline(
        &self,
        job: &Job,
        cancel: &CancellationToken,
        resume: bool,
        failed_windows: &mut Vec<i64>,
        gaps: &mut Vec<Gap>,
    ) -> Result<Series, CandelaError> {
        if cancel.is_cancelled() {
            return Err(CandelaError::Cancelled);
        }
        let now = self.now();

        let stored = if resume {
            self.sink.load(&job.symbol, &job.timeframe).await?
        } else {
            None
        };
        let planned = match &stored {
            Some(series) => {
                let from = resume_point(series).max(job.start);
                #[cfg(feature = "tracing")]
                tracing::debug!(stored = series.len(), from, "resuming from stored series");
                Job {
                    start: from,
                    ..job.clone()
                }
            }
            None => job.clone(),
        };

        let windows = plan_windows(&planned, now)?;
        let results = self
            .scheduler()
            .run(&job.symbol, &job.timeframe, windows, cancel)
            .await?;

        let mut failed: Vec<&Window> = results
            .iter()
            .filter(|r| matches!(r, FetchResult::Failure { .. }))
            .map(FetchResult::window)
            .collect();
        failed.sort_by_key(|w| w.index);
        failed_windows.extend(failed.into_iter().map(|w| w.start));

        let merged = merge_onto_stored(&job.symbol, &job.timeframe, results, stored)?;

        *gaps = find_gaps(&merged.series, job.timeframe_ms);
        #[cfg(feature = "tracing")]
        for gap in gaps.iter() {
            tracing::warn!(
                after = gap.after,
                before = gap.before,
                missing = gap.missing,
                "gap in series"
            );
        }

        if cancel.is_cancelled() {
            return Err(CandelaError::Cancelled);
        }
        self.sink
            .write(&job.symbol, &job.timeframe, &merged.series)
            .await?;
        Ok(merged.series)
    }
}

/// Second-to-last stored candle, so the last one (possibly still open when
/// stored) is fetched again.
fn resume_point(series: &Series) -> i64 {
    let candles = series.candles();
    candles
        .len()
        .checked_sub(2)
        .map_or(series.first().ts, |i| candles[i].ts)
}
