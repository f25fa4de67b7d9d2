//! Expansion of static configuration into job descriptors.

use std::collections::HashSet;

use crate::time::parse_start_date;
use crate::{CandelaError, DownloadConfig, Job};

/// Build the job list for a download run.
///
/// Jobs are produced timeframe-major: every symbol of the first timeframe,
/// then every symbol of the second, and so on.
///
/// # Errors
/// Returns `InvalidConfiguration` when the provider has no known request
/// limit, a timeframe is unknown or non-positive, the start date is malformed,
/// the symbol or timeframe list is empty, or a symbol/timeframe is repeated.
pub fn build_jobs(cfg: &DownloadConfig) -> Result<Vec<Job>, CandelaError> {
    let limit = cfg.provider_limit().ok_or_else(|| {
        CandelaError::invalid_config(format!("no request limit known for provider '{}'", cfg.provider))
    })?;
    if limit == 0 {
        return Err(CandelaError::invalid_config(format!(
            "request limit for provider '{}' must be positive",
            cfg.provider
        )));
    }
    if cfg.symbols.is_empty() {
        return Err(CandelaError::invalid_config("no symbols configured"));
    }
    if cfg.timeframes.is_empty() {
        return Err(CandelaError::invalid_config("no timeframes configured"));
    }
    reject_duplicates("symbol", &cfg.symbols)?;
    reject_duplicates("timeframe", &cfg.timeframes)?;

    let start = parse_start_date(&cfg.start_date)?;

    let mut jobs = Vec::with_capacity(cfg.symbols.len() * cfg.timeframes.len());
    for tf in &cfg.timeframes {
        let tf_ms = timeframe_ms(cfg, tf)?;
        for symbol in &cfg.symbols {
            let job = Job::new(symbol.clone(), tf.clone(), start, limit, tf_ms);
            // Surface overflow here rather than mid-run.
            job.step_ms()?;
            jobs.push(job);
        }
    }
    Ok(jobs)
}

/// Duration of a configured timeframe.
///
/// # Errors
/// Returns `InvalidConfiguration` for unknown or non-positive timeframes.
pub fn timeframe_ms(cfg: &DownloadConfig, timeframe: &str) -> Result<i64, CandelaError> {
    match cfg.timeframe_duration(timeframe) {
        Some(ms) if ms > 0 => Ok(ms),
        Some(ms) => Err(CandelaError::invalid_config(format!(
            "timeframe '{timeframe}' has non-positive duration {ms}"
        ))),
        None => Err(CandelaError::invalid_config(format!(
            "unknown timeframe '{timeframe}'"
        ))),
    }
}

fn reject_duplicates(what: &str, items: &[String]) -> Result<(), CandelaError> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(item.as_str()) {
            return Err(CandelaError::invalid_config(format!(
                "duplicate {what} '{item}'"
            )));
        }
    }
    Ok(())
}
