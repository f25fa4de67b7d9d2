use std::sync::Arc;
use std::time::Duration;

use candela_core::backoff::from_config;
use candela_core::time::now_ms;
use candela_core::{
    BackoffConfig, BackoffStrategy, CandelaError, FetchConfig, FetchWindow, Immediate,
    ProgressSnapshot, Sink,
};
use candela_middleware::TimeoutProvider;
use tokio::sync::{Semaphore, watch};

use crate::fetcher::CandleFetcher;
use crate::progress::ProgressTracker;
use crate::scheduler::RequestScheduler;

/// Source of "now" in milliseconds, sampled once per job.
pub type Clock = Arc<dyn Fn() -> i64 + Send + Sync>;

/// Downloader bound to one provider and one sink.
///
/// All jobs run through the same instance share its request budget, so the
/// provider never sees more than `max_in_flight` concurrent calls from it.
pub struct Candela {
    pub(crate) provider: Arc<dyn FetchWindow>,
    pub(crate) sink: Arc<dyn Sink>,
    pub(crate) budget: Arc<Semaphore>,
    pub(crate) backoff: Arc<dyn BackoffStrategy>,
    pub(crate) clock: Clock,
    pub(crate) progress: Arc<ProgressTracker>,
    pub(crate) max_attempts: u32,
    pub(crate) job_concurrency: usize,
    pub(crate) resume: bool,
}

/// Builder for constructing a [`Candela`] downloader.
pub struct CandelaBuilder {
    provider: Option<Arc<dyn FetchWindow>>,
    sink: Option<Arc<dyn Sink>>,
    backoff: Option<Arc<dyn BackoffStrategy>>,
    clock: Option<Clock>,
    cfg: FetchConfig,
}

impl Default for CandelaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CandelaBuilder {
    /// Create a new builder with the defaults of [`FetchConfig`].
    ///
    /// Behavior and trade-offs:
    /// - Starts without provider or sink; both are required by [`build`](Self::build).
    /// - Defaults: 5 requests in flight, 3 attempts per window with immediate
    ///   re-issue, one job at a time, no per-call timeout, no resume.
    #[must_use]
    pub fn new() -> Self {
        Self {
            provider: None,
            sink: None,
            backoff: None,
            clock: None,
            cfg: FetchConfig::default(),
        }
    }

    /// Provider serving candle windows. Wrap it with middleware beforehand if needed.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn FetchWindow>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Destination of finalized series.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Apply every knob of a [`FetchConfig`] at once.
    ///
    /// Replaces any custom backoff strategy set earlier with the one the
    /// config describes.
    #[must_use]
    pub fn fetch_config(mut self, cfg: FetchConfig) -> Self {
        self.backoff = Some(from_config(&cfg.backoff));
        self.cfg = cfg;
        self
    }

    /// Maximum concurrent provider calls across all jobs.
    ///
    /// Behavior and trade-offs:
    /// - Should reflect the provider's rate limit; higher values finish faster
    ///   until the provider starts rejecting requests.
    /// - Zero is rejected by [`build`](Self::build).
    #[must_use]
    pub const fn max_in_flight(mut self, n: usize) -> Self {
        self.cfg.max_in_flight = n;
        self
    }

    /// Attempts per window, including the first one.
    #[must_use]
    pub const fn max_attempts(mut self, n: u32) -> Self {
        self.cfg.max_attempts = n;
        self
    }

    /// Delay policy between attempts, from configuration.
    #[must_use]
    pub fn backoff(mut self, cfg: BackoffConfig) -> Self {
        self.cfg.backoff = cfg;
        self.backoff = Some(from_config(&cfg));
        self
    }

    /// Custom delay policy between attempts.
    #[must_use]
    pub fn backoff_strategy(mut self, strategy: Arc<dyn BackoffStrategy>) -> Self {
        self.backoff = Some(strategy);
        self
    }

    /// Jobs processed concurrently by [`Candela::run_all`].
    ///
    /// Behavior and trade-offs:
    /// - All jobs still share the single request budget; raising this mostly
    ///   overlaps the merge and write phases of one job with fetching of others.
    #[must_use]
    pub const fn job_concurrency(mut self, n: usize) -> Self {
        self.cfg.job_concurrency = n;
        self
    }

    /// Per-call timeout; a call exceeding it counts as a failed attempt.
    #[must_use]
    pub fn provider_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.provider_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Continue from data already held by the sink instead of the job start.
    #[must_use]
    pub const fn resume(mut self, yes: bool) -> Self {
        self.cfg.resume = yes;
        self
    }

    /// Replace the wall clock, e.g. for deterministic tests.
    #[must_use]
    pub fn clock(mut self, clock: Clock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the downloader.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` when the provider or sink is missing or a
    /// concurrency/attempt budget is zero.
    pub fn build(self) -> Result<Candela, CandelaError> {
        let provider = self
            .provider
            .ok_or_else(|| CandelaError::invalid_config("no provider registered"))?;
        let sink = self
            .sink
            .ok_or_else(|| CandelaError::invalid_config("no sink registered"))?;
        if self.cfg.max_in_flight == 0 {
            return Err(CandelaError::invalid_config("max_in_flight must be positive"));
        }
        if self.cfg.max_attempts == 0 {
            return Err(CandelaError::invalid_config("max_attempts must be positive"));
        }
        if self.cfg.job_concurrency == 0 {
            return Err(CandelaError::invalid_config(
                "job_concurrency must be positive",
            ));
        }

        let provider = match self.cfg.provider_timeout() {
            Some(t) if t.is_zero() => {
                return Err(CandelaError::invalid_config(
                    "provider_timeout must be positive",
                ));
            }
            Some(t) => Arc::new(TimeoutProvider::new(provider, t)) as Arc<dyn FetchWindow>,
            None => provider,
        };

        Ok(Candela {
            provider,
            sink,
            budget: Arc::new(Semaphore::new(self.cfg.max_in_flight)),
            backoff: self.backoff.unwrap_or_else(|| Arc::new(Immediate)),
            clock: self.clock.unwrap_or_else(|| Arc::new(now_ms)),
            progress: Arc::new(ProgressTracker::new()),
            max_attempts: self.cfg.max_attempts,
            job_concurrency: self.cfg.job_concurrency,
            resume: self.cfg.resume,
        })
    }
}

impl Candela {
    /// Start building a new `Candela` instance.
    ///
    /// ```rust,ignore
    /// use std::sync::Arc;
    /// use candela::Candela;
    ///
    /// let candela = Candela::builder()
    ///     .with_provider(Arc::new(BinanceConnector::new_default()?))
    ///     .with_sink(Arc::new(CsvSink::new("./database", "binance")))
    ///     .max_in_flight(5)
    ///     .build()?;
    /// let report = candela.run_all(jobs).await?;
    /// ```
    #[must_use]
    pub fn builder() -> CandelaBuilder {
        CandelaBuilder::new()
    }

    /// Name of the provider every request goes to.
    #[must_use]
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Receiver of progress updates across every run of this instance.
    #[must_use]
    pub fn progress(&self) -> watch::Receiver<ProgressSnapshot> {
        self.progress.subscribe()
    }

    /// Current progress counters.
    #[must_use]
    pub fn progress_snapshot(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Permits of the request budget currently free.
    #[must_use]
    pub fn available_requests(&self) -> usize {
        self.budget.available_permits()
    }

    pub(crate) fn now(&self) -> i64 {
        (self.clock)()
    }

    pub(crate) fn scheduler(&self) -> RequestScheduler {
        let fetcher = CandleFetcher::new(
            Arc::clone(&self.provider),
            self.max_attempts,
            Arc::clone(&self.backoff),
        )
        .with_budget(Arc::clone(&self.budget));
        RequestScheduler::new(fetcher, Arc::clone(&self.progress))
    }
}
