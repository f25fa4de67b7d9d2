//! Dispatch of a job's windows as a cancellable task group.

use std::collections::HashMap;
use std::sync::Arc;

use candela_core::{CandelaError, FetchResult, Window};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::fetcher::CandleFetcher;
use crate::progress::ProgressTracker;

/// Runs every window of one job concurrently under the fetcher's request budget.
///
/// Guarantees:
/// - exactly one [`FetchResult`] per submitted window, tagged with its window;
/// - at most as many provider calls in flight as the shared budget has permits,
///   across all schedulers sharing it;
/// - on cancellation no further provider call starts; the remaining tasks are
///   aborted, which drops any permit they hold, their results are discarded and
///   their windows are counted as done in the progress totals.
#[derive(Clone)]
pub struct RequestScheduler {
    fetcher: CandleFetcher,
    progress: Arc<ProgressTracker>,
}

impl RequestScheduler {
    /// Scheduler reporting into `progress`.
    #[must_use]
    pub const fn new(fetcher: CandleFetcher, progress: Arc<ProgressTracker>) -> Self {
        Self { fetcher, progress }
    }

    /// Fetch all `windows` and return their results in completion order.
    ///
    /// # Errors
    /// Returns `Cancelled` when `cancel` fires before every window completed,
    /// including when it was already cancelled on entry.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::scheduler::run",
            skip(self, windows, cancel),
            fields(windows = windows.len()),
        )
    )]
    pub async fn run(
        &self,
        symbol: &str,
        timeframe: &str,
        windows: Vec<Window>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FetchResult>, CandelaError> {
        if cancel.is_cancelled() {
            return Err(CandelaError::Cancelled);
        }
        self.progress.add_requests(windows.len());

        let mut set = JoinSet::new();
        let mut origin = HashMap::with_capacity(windows.len());
        for window in windows {
            let fetcher = self.fetcher.clone();
            let cancel = cancel.clone();
            let (symbol, timeframe) = (symbol.to_string(), timeframe.to_string());
            let handle = set.spawn(async move {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    result = fetcher.fetch(&symbol, &timeframe, window) => Some(result),
                }
            });
            origin.insert(handle.id(), window);
        }

        let mut out = Vec::with_capacity(origin.len());
        let mut settled = 0;
        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    set.abort_all();
                    // Wait until every task is gone so its permit is back.
                    while set.join_next().await.is_some() {}
                    let abandoned = origin.len() - settled;
                    self.progress.abandon_requests(abandoned);
                    #[cfg(feature = "tracing")]
                    tracing::debug!(symbol, timeframe, abandoned, "scheduler cancelled");
                    return Err(CandelaError::Cancelled);
                }
                next = set.join_next_with_id() => match next {
                    None => break,
                    Some(Ok((_, Some(result)))) => {
                        settled += 1;
                        let candles = match &result {
                            FetchResult::Success { candles, .. } => candles.len(),
                            FetchResult::Failure { .. } => 0,
                        };
                        self.progress.request_done(candles);
                        out.push(result);
                    }
                    // The task observed the token first; the cancel branch settles it.
                    Some(Ok((_, None))) => {}
                    Some(Err(e)) => {
                        // A panicking provider still yields a result for its window.
                        let Some(window) = origin.get(&e.id()).copied() else {
                            continue;
                        };
                        settled += 1;
                        self.progress.request_done(0);
                        out.push(FetchResult::Failure {
                            window,
                            reason: CandelaError::provider(
                                self.fetcher.provider_name(),
                                -1,
                                format!("fetch task failed: {e}"),
                            ),
                        });
                    }
                },
            }
        }
        Ok(out)
    }
}
