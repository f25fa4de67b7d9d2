use std::fs;
use std::path::{Path, PathBuf};

use candela_core::{CandelaError, estimate_step_ms};

use crate::codec::read_candles;
use crate::symbol_from_file_stem;

/// Summary of one stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSeries {
    /// Provider directory.
    pub provider: String,
    /// Timeframe directory.
    pub timeframe: String,
    /// Symbol recovered from the file name.
    pub symbol: String,
    /// Location of the file.
    pub path: PathBuf,
    /// Number of data rows.
    pub rows: usize,
    /// First timestamp, if any row exists.
    pub first_ts: Option<i64>,
    /// Last timestamp, if any row exists.
    pub last_ts: Option<i64>,
    /// Candle spacing inferred from the rows; `None` below two rows.
    pub step_ms: Option<i64>,
}

fn subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, CandelaError> {
    let mut out = Vec::new();
    let entries = fs::read_dir(dir)
        .map_err(|e| CandelaError::persistence(format!("{}: {e}", dir.display())))?;
    for entry in entries {
        let entry =
            entry.map_err(|e| CandelaError::persistence(format!("{}: {e}", dir.display())))?;
        let path = entry.path();
        if path.is_dir() {
            out.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    Ok(out)
}

/// List every `<root>/<provider>/<timeframe>/<symbol>.csv` file with its row
/// count, time span and inferred cadence, sorted by provider, timeframe and
/// symbol.
///
/// Files that cannot be parsed are skipped. A missing `root` yields an empty list.
///
/// # Errors
/// Returns `Persistence` when a directory exists but cannot be listed.
pub fn inventory(root: &Path) -> Result<Vec<StoredSeries>, CandelaError> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for (provider, provider_dir) in subdirs(root)? {
        for (timeframe, tf_dir) in subdirs(&provider_dir)? {
            let entries = fs::read_dir(&tf_dir)
                .map_err(|e| CandelaError::persistence(format!("{}: {e}", tf_dir.display())))?;
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("csv") {
                    continue;
                }
                let Some(stem) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                    continue;
                };
                match read_candles(&path) {
                    Ok(candles) => out.push(StoredSeries {
                        provider: provider.clone(),
                        timeframe: timeframe.clone(),
                        symbol: symbol_from_file_stem(&stem),
                        rows: candles.len(),
                        first_ts: candles.first().map(|c| c.ts),
                        last_ts: candles.last().map(|c| c.ts),
                        step_ms: estimate_step_ms(&candles),
                        path,
                    }),
                    Err(e) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %e, "skipping unreadable file in inventory");
                        #[cfg(not(feature = "tracing"))]
                        let _ = e;
                    }
                }
            }
        }
    }
    out.sort_by(|a, b| {
        (&a.provider, &a.timeframe, &a.symbol).cmp(&(&b.provider, &b.timeframe, &b.symbol))
    });
    Ok(out)
}
