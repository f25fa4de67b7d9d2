//! Date and timestamp helpers (all UTC, milliseconds).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::CandelaError;

/// Format used for the `date` column of persisted files.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Parse a `DD-MM-YYYY` start date as UTC midnight, in milliseconds.
///
/// ```
/// assert_eq!(candela_core::time::parse_start_date("01-06-2017").unwrap(), 1_496_275_200_000);
/// ```
///
/// # Errors
/// Returns `InvalidConfiguration` for anything that is not a valid calendar date.
pub fn parse_start_date(s: &str) -> Result<i64, CandelaError> {
    let date = NaiveDate::parse_from_str(s.trim(), "%d-%m-%Y").map_err(|e| {
        CandelaError::invalid_config(format!("start date '{s}' is not DD-MM-YYYY: {e}"))
    })?;
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| CandelaError::invalid_config(format!("start date '{s}' out of range")))
}

/// Render a millisecond timestamp as `YYYY-MM-DD HH:MM:SS` (UTC).
///
/// Out-of-range timestamps fall back to the raw number.
#[must_use]
pub fn format_ts(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map_or_else(|| ms.to_string(), |dt| dt.format(TS_FORMAT).to_string())
}

/// Parse a timestamp rendered by [`format_ts`]; plain integers are accepted as milliseconds.
///
/// # Errors
/// Returns `Persistence` when the value is neither form.
pub fn parse_ts(s: &str) -> Result<i64, CandelaError> {
    let s = s.trim();
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }
    NaiveDateTime::parse_from_str(s, TS_FORMAT)
        .map(|dt| dt.and_utc().timestamp_millis())
        .map_err(|e| CandelaError::Persistence(format!("bad timestamp '{s}': {e}")))
}

/// Current wall-clock time in milliseconds.
#[must_use]
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
