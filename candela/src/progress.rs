//! Run-wide progress counters.

use candela_core::ProgressSnapshot;
use tokio::sync::watch;

/// Shared progress counters published through a `watch` channel.
///
/// Every update mutates the snapshot under the channel's lock, so concurrent
/// jobs never lose increments. Publishing never waits for receivers and works
/// with none attached.
#[derive(Debug)]
pub struct ProgressTracker {
    tx: watch::Sender<ProgressSnapshot>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Tracker with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ProgressSnapshot::default());
        Self { tx }
    }

    /// New receiver observing every later update.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ProgressSnapshot> {
        self.tx.subscribe()
    }

    /// Current counters.
    #[must_use]
    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.tx.borrow()
    }

    pub(crate) fn add_jobs(&self, n: usize) {
        self.tx.send_modify(|s| s.jobs_total += n);
    }

    pub(crate) fn job_done(&self) {
        self.tx.send_modify(|s| s.jobs_done += 1);
    }

    pub(crate) fn add_requests(&self, n: usize) {
        self.tx.send_modify(|s| s.requests_total += n);
    }

    /// Settle `n` requests that were planned but will never run.
    pub(crate) fn abandon_requests(&self, n: usize) {
        if n > 0 {
            self.tx.send_modify(|s| s.requests_done += n);
        }
    }

    pub(crate) fn request_done(&self, candles: usize) {
        self.tx.send_modify(|s| {
            s.requests_done += 1;
            s.candles += candles;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn updates_reach_subscribers() {
        let t = ProgressTracker::new();
        let mut rx = t.subscribe();
        t.add_jobs(2);
        t.add_requests(3);
        t.request_done(1000);
        t.job_done();
        rx.changed().await.unwrap();
        assert_eq!(
            *rx.borrow_and_update(),
            ProgressSnapshot {
                jobs_done: 1,
                jobs_total: 2,
                requests_done: 1,
                requests_total: 3,
                candles: 1000,
            }
        );
    }

    #[test]
    fn abandoned_requests_settle_the_total() {
        let t = ProgressTracker::new();
        t.add_requests(4);
        t.request_done(10);
        t.abandon_requests(3);
        let s = t.snapshot();
        assert_eq!(s.requests_done, s.requests_total);
        assert_eq!(s.candles, 10);
    }

    #[test]
    fn publishing_without_receivers_is_fine() {
        let t = ProgressTracker::new();
        t.request_done(5);
        assert_eq!(t.snapshot().candles, 5);
    }
}
