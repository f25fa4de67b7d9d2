//! Encoding of a series as `date,open,high,low,close,volume` rows.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use candela_core::time::{format_ts, parse_ts};
use candela_core::{Candle, CandelaError, Series};
use rust_decimal::Decimal;

/// Column header of every persisted file.
pub const HEADER: [&str; 6] = ["date", "open", "high", "low", "close", "volume"];

fn io_err(path: &Path, e: impl std::fmt::Display) -> CandelaError {
    CandelaError::persistence(format!("{}: {e}", path.display()))
}

/// Write `series` to `path`, replacing any previous file.
///
/// Rows go to a temporary file in the same directory which is then renamed
/// over `path`, so readers never observe a half-written file.
///
/// # Errors
/// Returns `Persistence` on any I/O failure.
pub fn write_series(path: &Path, series: &Series) -> Result<(), CandelaError> {
    let dir = path
        .parent()
        .ok_or_else(|| io_err(path, "path has no parent directory"))?;
    fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    let tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| io_err(dir, e))?;
    {
        let mut w = csv::Writer::from_writer(tmp.as_file());
        w.write_record(HEADER).map_err(|e| io_err(path, e))?;
        for c in series {
            w.write_record([
                format_ts(c.ts),
                c.open.to_string(),
                c.high.to_string(),
                c.low.to_string(),
                c.close.to_string(),
                c.volume.to_string(),
            ])
            .map_err(|e| io_err(path, e))?;
        }
        w.flush().map_err(|e| io_err(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| io_err(path, e))?;
    tmp.persist(path).map_err(|e| io_err(path, e.error))?;
    Ok(())
}

/// Read the candles stored at `path`, in file order.
///
/// # Errors
/// Returns `Persistence` if the file cannot be opened or a row does not parse.
pub fn read_candles(path: &Path) -> Result<Vec<Candle>, CandelaError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| io_err(path, e))?;
    let mut candles = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| io_err(path, e))?;
        if record.len() < HEADER.len() {
            return Err(io_err(
                path,
                format!("row {} has {} columns", line + 2, record.len()),
            ));
        }
        let dec = |i: usize| {
            Decimal::from_str(record[i].trim()).map_err(|e| {
                io_err(
                    path,
                    format!("row {} column {}: {e}", line + 2, HEADER[i]),
                )
            })
        };
        candles.push(Candle::new(
            parse_ts(&record[0]).map_err(|e| io_err(path, e))?,
            dec(1)?,
            dec(2)?,
            dec(3)?,
            dec(4)?,
            dec(5)?,
        ));
    }
    Ok(candles)
}

/// Read a stored file back as a validated series.
///
/// The file stem (dash turned back into a slash) and the parent directory
/// name label any validation error.
///
/// # Errors
/// `Persistence` when the file cannot be read, `EmptySeries` when it holds
/// no rows and `CorruptSeries` when the rows are out of order or malformed.
pub fn read_series(path: &Path) -> Result<Series, CandelaError> {
    let candles = read_candles(path)?;
    let symbol = path
        .file_stem()
        .map(|s| crate::symbol_from_file_stem(&s.to_string_lossy()))
        .unwrap_or_default();
    let timeframe = path
        .parent()
        .and_then(Path::file_name)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Series::try_new(&symbol, &timeframe, candles)
}
