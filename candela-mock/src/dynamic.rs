use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use candela_core::{Candle, CandelaError, FetchWindow};

use crate::stats::CallStats;

/// Instruction for how a call should behave for a given window.
#[derive(Clone)]
pub enum MockBehavior {
    /// Return the provided candles immediately.
    Return(Vec<Candle>),
    /// Fail immediately with the provided error.
    Fail(CandelaError),
    /// Fail the first `failures` calls with `error`, then return `candles`.
    FailTimes {
        /// Number of leading failures.
        failures: u32,
        /// Error returned by each failing call.
        error: CandelaError,
        /// Candles returned once the failures are used up.
        candles: Vec<Candle>,
    },
    /// Hang indefinitely (simulate a stalled connection).
    Hang,
}

#[derive(Default)]
struct InternalState {
    window_rules: HashMap<(String, i64), MockBehavior>,
    symbol_rules: HashMap<String, MockBehavior>,
    attempts: HashMap<(String, i64), u32>,
    requests: Vec<(String, String, i64, u32)>,
    fallback: Option<Arc<dyn FetchWindow>>,
}

/// Controller handle used by tests to drive the dynamic mock from the outside.
pub struct DynamicMockController {
    state: Arc<Mutex<InternalState>>,
    stats: Arc<CallStats>,
}

impl DynamicMockController {
    /// Set the behavior for the window of `symbol` starting at `since`.
    pub async fn set_window_behavior(&self, symbol: &str, since: i64, behavior: MockBehavior) {
        let mut guard = self.state.lock().await;
        guard
            .window_rules
            .insert((symbol.to_string(), since), behavior);
    }

    /// Set the behavior for every window of `symbol` without a window rule.
    pub async fn set_symbol_behavior(&self, symbol: &str, behavior: MockBehavior) {
        let mut guard = self.state.lock().await;
        guard.symbol_rules.insert(symbol.to_string(), behavior);
    }

    /// Delegate unscripted calls to `provider` instead of returning an empty batch.
    pub async fn set_fallback(&self, provider: Arc<dyn FetchWindow>) {
        let mut guard = self.state.lock().await;
        guard.fallback = Some(provider);
    }

    /// Every request seen so far as `(symbol, timeframe, since, limit)`, in arrival order.
    pub async fn requests(&self) -> Vec<(String, String, i64, u32)> {
        self.state.lock().await.requests.clone()
    }

    /// Number of calls made for one window.
    pub async fn attempts(&self, symbol: &str, since: i64) -> u32 {
        let guard = self.state.lock().await;
        guard
            .attempts
            .get(&(symbol.to_string(), since))
            .copied()
            .unwrap_or(0)
    }

    /// Call counters of the controlled provider.
    #[must_use]
    pub fn stats(&self) -> Arc<CallStats> {
        Arc::clone(&self.stats)
    }

    /// Clear all configured behaviors and request logs.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.window_rules.clear();
        guard.symbol_rules.clear();
        guard.attempts.clear();
        guard.requests.clear();
        guard.fallback = None;
    }
}

/// A provider that defers all behavior to an external controller.
pub struct DynamicMockProvider {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
    stats: Arc<CallStats>,
}

impl DynamicMockProvider {
    /// Create a new dynamic mock provider and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn FetchWindow>, DynamicMockController) {
        let state = Arc::new(Mutex::new(InternalState::default()));
        let stats = Arc::new(CallStats::default());
        let controller = DynamicMockController {
            state: Arc::clone(&state),
            stats: Arc::clone(&stats),
        };
        let me = Arc::new(Self { name, state, stats });
        (me as Arc<dyn FetchWindow>, controller)
    }
}

#[async_trait]
impl FetchWindow for DynamicMockProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch_window(
        &self,
        symbol: &str,
        timeframe: &str,
        since: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, CandelaError> {
        let _guard = self.stats.enter();

        // Snapshot the behavior without holding the lock across await points.
        let (behavior, attempt, fallback) = {
            let mut guard = self.state.lock().await;
            guard
                .requests
                .push((symbol.to_string(), timeframe.to_string(), since, limit));
            let key = (symbol.to_string(), since);
            let attempt = {
                let n = guard.attempts.entry(key.clone()).or_insert(0);
                *n += 1;
                *n
            };
            let behavior = guard
                .window_rules
                .get(&key)
                .or_else(|| guard.symbol_rules.get(symbol))
                .cloned();
            (behavior, attempt, guard.fallback.clone())
        };

        match behavior {
            Some(MockBehavior::Return(candles)) => Ok(candles),
            Some(MockBehavior::Fail(e)) => Err(e),
            Some(MockBehavior::FailTimes {
                failures,
                error,
                candles,
            }) => {
                if attempt <= failures {
                    Err(error)
                } else {
                    Ok(candles)
                }
            }
            Some(MockBehavior::Hang) => std::future::pending().await,
            None => match fallback {
                Some(inner) => inner.fetch_window(symbol, timeframe, since, limit).await,
                None => Ok(Vec::new()),
            },
        }
    }
}
