use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use candela_core::{CandelaError, Series, Sink};

#[derive(Default)]
struct SinkState {
    series: HashMap<(String, String), Series>,
    writes: Vec<(String, String)>,
    failing: HashSet<String>,
}

/// In-memory [`Sink`]; clones share storage.
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<SinkState>>,
}

impl MemorySink {
    /// Empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write for `symbol` fail with `Persistence`.
    pub async fn fail_writes_for(&self, symbol: &str) {
        self.state.lock().await.failing.insert(symbol.to_string());
    }

    /// Store a series as if a previous run had written it.
    pub async fn preload(&self, symbol: &str, timeframe: &str, series: Series) {
        self.state
            .lock()
            .await
            .series
            .insert((symbol.to_string(), timeframe.to_string()), series);
    }

    /// Currently stored series for a pair.
    pub async fn get(&self, symbol: &str, timeframe: &str) -> Option<Series> {
        self.state
            .lock()
            .await
            .series
            .get(&(symbol.to_string(), timeframe.to_string()))
            .cloned()
    }

    /// Successful writes in order, as `(symbol, timeframe)`.
    pub async fn writes(&self) -> Vec<(String, String)> {
        self.state.lock().await.writes.clone()
    }
}

#[async_trait]
impl Sink for MemorySink {
    async fn write(
        &self,
        symbol: &str,
        timeframe: &str,
        series: &Series,
    ) -> Result<(), CandelaError> {
        let mut guard = self.state.lock().await;
        if guard.failing.contains(symbol) {
            return Err(CandelaError::persistence(format!(
                "refusing to store {symbol} {timeframe}"
            )));
        }
        guard
            .series
            .insert((symbol.to_string(), timeframe.to_string()), series.clone());
        guard
            .writes
            .push((symbol.to_string(), timeframe.to_string()));
        Ok(())
    }

    async fn load(&self, symbol: &str, timeframe: &str) -> Result<Option<Series>, CandelaError> {
        Ok(self.get(symbol, timeframe).await)
    }
}
