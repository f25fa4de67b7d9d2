//! Loading of the JSON configuration directory.
//!
//! - `download.json` (required): a [`DownloadConfig`].
//! - `exchange_limit.json` (optional): provider -> candles per request.
//! - `tf_ms.json` (optional): timeframe label -> milliseconds.
//!
//! Precedence, highest first: maps inside `download.json`, the optional
//! files, the built-in tables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use candela_core::jobs::build_jobs;
use candela_core::{CandelaError, DownloadConfig, DownloadMode, Job};
use serde::de::DeserializeOwned;

/// Environment variable naming the configuration directory.
pub const CONFIG_DIR_ENV: &str = "CANDELA_CONFIG_DIR";
/// Directory used when [`CONFIG_DIR_ENV`] is unset.
pub const DEFAULT_CONFIG_DIR: &str = "./database";

/// A validated configuration together with the jobs it expands to.
#[derive(Debug)]
pub struct Settings {
    pub download: DownloadConfig,
    pub jobs: Vec<Job>,
}

pub fn config_dir() -> PathBuf {
    std::env::var_os(CONFIG_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR), PathBuf::from)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CandelaError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| CandelaError::invalid_config(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| CandelaError::invalid_config(format!("{}: {e}", path.display())))
}

fn read_optional_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CandelaError> {
    if path.exists() {
        read_json(path).map(Some)
    } else {
        Ok(None)
    }
}

fn merge_under<V>(inline: &mut BTreeMap<String, V>, file: Option<BTreeMap<String, V>>) {
    for (k, v) in file.into_iter().flatten() {
        inline.entry(k).or_insert(v);
    }
}

/// Read and validate the configuration in `dir`.
///
/// # Errors
/// Returns `InvalidConfiguration` when a file is missing or malformed, or
/// when the configuration cannot be expanded into jobs.
pub fn load(dir: &Path) -> Result<Settings, CandelaError> {
    let mut download: DownloadConfig = read_json(&dir.join("download.json"))?;
    merge_under(
        &mut download.provider_limits,
        read_optional_json(&dir.join("exchange_limit.json"))?,
    );
    merge_under(
        &mut download.timeframe_ms,
        read_optional_json(&dir.join("tf_ms.json"))?,
    );
    validate(&download)?;
    let jobs = build_jobs(&download)?;
    Ok(Settings { download, jobs })
}

fn validate(cfg: &DownloadConfig) -> Result<(), CandelaError> {
    if let Some(q) = &cfg.quota
        && (q.limit == 0 || q.window_ms == 0)
    {
        return Err(CandelaError::invalid_config(
            "quota limit and window_ms must be positive",
        ));
    }
    if cfg.fetch.provider_timeout_ms == Some(0) {
        return Err(CandelaError::invalid_config(
            "fetch.provider_timeout_ms must be positive",
        ));
    }
    if cfg.mode == DownloadMode::Snapshot && cfg.timeframes.len() != 1 {
        return Err(CandelaError::invalid_config(
            "snapshot mode takes exactly one timeframe",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn optional_tables_fill_in_under_inline_overrides() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "download.json",
            r#"{
                "provider": "binance",
                "symbols": ["BTC/USDT"],
                "timeframes": ["3h"],
                "start_date": "01-06-2017",
                "timeframe_ms": { "3h": 10800000 }
            }"#,
        );
        write(dir.path(), "tf_ms.json", r#"{ "3h": 1, "6h": 21600000 }"#);
        write(dir.path(), "exchange_limit.json", r#"{ "binance": 500 }"#);

        let s = load(dir.path()).unwrap();
        assert_eq!(s.download.timeframe_duration("3h"), Some(10_800_000));
        assert_eq!(s.download.timeframe_duration("6h"), Some(21_600_000));
        assert_eq!(s.download.provider_limit(), Some(500));
        assert_eq!(s.jobs.len(), 1);
        assert_eq!(s.jobs[0].provider_limit, 500);
        assert_eq!(s.download.output_dir, "./database");
    }

    #[test]
    fn zero_quota_and_multi_timeframe_snapshot_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "download.json",
            r#"{
                "provider": "binance", "symbols": ["BTC/USDT"], "timeframes": ["1h"],
                "start_date": "01-06-2017", "quota": { "limit": 0, "window_ms": 1000 }
            }"#,
        );
        assert!(matches!(
            load(dir.path()),
            Err(CandelaError::InvalidConfiguration(_))
        ));

        write(
            dir.path(),
            "download.json",
            r#"{
                "provider": "binance", "symbols": ["BTC/USDT"], "timeframes": ["1h", "1d"],
                "start_date": "01-06-2017", "mode": "snapshot"
            }"#,
        );
        assert!(matches!(
            load(dir.path()),
            Err(CandelaError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn missing_download_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("download.json"));
    }
}
