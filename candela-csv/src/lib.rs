//! candela-csv
//!
//! CSV persistence for finalized series. The default layout is
//! `<root>/<provider>/<timeframe>/<BASE-QUOTE>.csv`; snapshots use a flat
//! `<dir>/<BASE-QUOTE>.csv` layout.
#![warn(missing_docs)]

mod codec;
mod inventory;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use candela_core::{CandelaError, Series, Sink};

pub use codec::{HEADER, read_candles, read_series, write_series};
pub use inventory::{StoredSeries, inventory};

/// Where files are placed relative to the sink's directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// `<root>/<provider>/<timeframe>/<file>.csv`
    Nested {
        /// Root directory.
        root: PathBuf,
        /// Provider directory name.
        provider: String,
    },
    /// `<dir>/<file>.csv`, regardless of timeframe.
    Flat {
        /// Target directory.
        dir: PathBuf,
    },
}

/// [`Sink`] writing one CSV file per series.
#[derive(Debug, Clone)]
pub struct CsvSink {
    layout: Layout,
}

impl CsvSink {
    /// Nested layout under `root` for `provider`.
    pub fn new(root: impl Into<PathBuf>, provider: impl Into<String>) -> Self {
        Self {
            layout: Layout::Nested {
                root: root.into(),
                provider: provider.into(),
            },
        }
    }

    /// Flat layout directly inside `dir`.
    pub fn flat(dir: impl Into<PathBuf>) -> Self {
        Self {
            layout: Layout::Flat { dir: dir.into() },
        }
    }

    /// Layout in use.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// File backing a `(symbol, timeframe)` pair.
    #[must_use]
    pub fn path_for(&self, symbol: &str, timeframe: &str) -> PathBuf {
        let file = format!("{}.csv", file_stem_for(symbol));
        match &self.layout {
            Layout::Nested { root, provider } => root.join(provider).join(timeframe).join(file),
            Layout::Flat { dir } => dir.join(file),
        }
    }
}

/// `BTC/USDT` -> `BTC-USDT`.
#[must_use]
pub fn file_stem_for(symbol: &str) -> String {
    symbol.replace('/', "-")
}

/// `BTC-USDT` -> `BTC/USDT`; only the first dash separates base and quote.
#[must_use]
pub fn symbol_from_file_stem(stem: &str) -> String {
    stem.replacen('-', "/", 1)
}

async fn blocking<T, F>(f: F) -> Result<T, CandelaError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CandelaError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CandelaError::persistence(format!("blocking task failed: {e}")))?
}

#[async_trait]
impl Sink for CsvSink {
    async fn write(
        &self,
        symbol: &str,
        timeframe: &str,
        series: &Series,
    ) -> Result<(), CandelaError> {
        let path = self.path_for(symbol, timeframe);
        let series = series.clone();
        #[cfg(feature = "tracing")]
        let shown = path.display().to_string();
        blocking(move || write_series(&path, &series)).await?;
        #[cfg(feature = "tracing")]
        tracing::debug!(symbol, timeframe, path = %shown, "series written");
        Ok(())
    }

    async fn load(&self, symbol: &str, timeframe: &str) -> Result<Option<Series>, CandelaError> {
        let path = self.path_for(symbol, timeframe);
        let (symbol, timeframe) = (symbol.to_string(), timeframe.to_string());
        blocking(move || load_path(&path, &symbol, &timeframe)).await
    }
}

fn load_path(path: &Path, symbol: &str, timeframe: &str) -> Result<Option<Series>, CandelaError> {
    if !path.exists() {
        return Ok(None);
    }
    let candles = read_candles(path)?;
    if candles.is_empty() {
        return Ok(None);
    }
    Series::try_new(symbol, timeframe, candles).map(Some)
}
