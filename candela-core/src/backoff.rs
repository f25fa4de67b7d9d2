//! Delay policies applied between attempts of the same provider request.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::{BackoffConfig, BackoffKind};

/// Computes how long to wait before re-issuing a failed request.
pub trait BackoffStrategy: Send + Sync {
    /// Delay before the next attempt, given how many attempts have failed so far (>= 1).
    fn delay(&self, failures: u32) -> Duration;
}

/// Re-issue immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

impl BackoffStrategy for Immediate {
    fn delay(&self, _failures: u32) -> Duration {
        Duration::ZERO
    }
}

/// Exponential growth from `min_backoff_ms`, capped at `max_backoff_ms`, plus jitter.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    cfg: BackoffConfig,
}

impl ExponentialBackoff {
    /// Build from configuration.
    #[must_use]
    pub const fn new(cfg: BackoffConfig) -> Self {
        Self { cfg }
    }

    /// Delay without jitter for the given failure count.
    #[must_use]
    pub fn base_delay_ms(&self, failures: u32) -> u64 {
        let factor = u64::from(self.cfg.factor.max(1));
        let exp = failures.saturating_sub(1);
        let mut ms = self.cfg.min_backoff_ms;
        for _ in 0..exp {
            ms = ms.saturating_mul(factor);
            if ms >= self.cfg.max_backoff_ms {
                break;
            }
        }
        ms.min(self.cfg.max_backoff_ms)
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay(&self, failures: u32) -> Duration {
        Duration::from_millis(jitter_wait(
            self.base_delay_ms(failures),
            u32::from(self.cfg.jitter_percent),
        ))
    }
}

/// Add up to `jitter_percent` of `base_ms` as random jitter.
#[must_use]
pub fn jitter_wait(base_ms: u64, jitter_percent: u32) -> u64 {
    if jitter_percent == 0 || base_ms == 0 {
        return base_ms;
    }
    let jitter_range = std::cmp::max(1, base_ms.saturating_mul(u64::from(jitter_percent)) / 100);
    let mut rng = rand::rng();
    base_ms + rng.random_range(0..jitter_range)
}

/// Select the strategy described by `cfg`.
#[must_use]
pub fn from_config(cfg: &BackoffConfig) -> Arc<dyn BackoffStrategy> {
    match cfg.kind {
        BackoffKind::Exponential => Arc::new(ExponentialBackoff::new(*cfg)),
        _ => Arc::new(Immediate),
    }
}
