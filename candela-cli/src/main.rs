//! `candela`: download OHLCV history as configured in `$CANDELA_CONFIG_DIR`.
//!
//! Exit status is 0 once every job has run, whatever the per-job outcomes,
//! and 2 when the configuration cannot be loaded or validated.

mod config;

use std::io::Write as _;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use candela::Candela;
use candela_binance::BinanceConnector;
use candela_core::{CandelaError, DownloadMode, FetchWindow, ProgressSnapshot, RunReport, Sink};
use candela_csv::CsvSink;
use candela_middleware::ProviderBuilder;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Overrides the Binance REST endpoint, e.g. to point at a local mock.
const BINANCE_URL_ENV: &str = "CANDELA_BINANCE_URL";
/// Per-call timeout when the configuration does not set one.
const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
/// Subdirectory of the output directory holding snapshot files.
const SNAPSHOT_DIR: &str = "quick_analysis";

#[tokio::main]
async fn main() -> ExitCode {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    let dir = config::config_dir();
    let settings = match config::load(&dir) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("candela: {e}");
            return ExitCode::from(2);
        }
    };

    match run(settings).await {
        Ok(report) => {
            println!("{}", report.summary().trim_end());
            ExitCode::SUCCESS
        }
        Err(e) if e.is_fatal() => {
            eprintln!("candela: {e}");
            ExitCode::from(2)
        }
        Err(e) => {
            eprintln!("candela: {e}");
            ExitCode::FAILURE
        }
    }
}

fn provider(settings: &Settings) -> Result<Arc<dyn FetchWindow>, CandelaError> {
    let cfg = &settings.download;
    if cfg.provider != BinanceConnector::NAME {
        return Err(CandelaError::invalid_config(format!(
            "unsupported provider '{}'; supported: {}",
            cfg.provider,
            BinanceConnector::NAME
        )));
    }
    let raw = match std::env::var(BINANCE_URL_ENV) {
        Ok(url) if !url.is_empty() => BinanceConnector::with_base_url(&url)?,
        _ => BinanceConnector::new_default()?,
    };
    let quota = cfg
        .quota
        .clone()
        .unwrap_or_else(BinanceConnector::default_quota);
    Ok(ProviderBuilder::new(Arc::new(raw))
        .with_timeout(cfg.fetch.provider_timeout().unwrap_or(DEFAULT_CALL_TIMEOUT))
        .with_quota(&quota)
        .build())
}

async fn run(settings: Settings) -> Result<RunReport, CandelaError> {
    let provider = provider(&settings)?;
    let cfg = &settings.download;
    let root = Path::new(&cfg.output_dir);

    let sink: Arc<dyn Sink> = match cfg.mode {
        DownloadMode::History => Arc::new(CsvSink::new(root, cfg.provider.clone())),
        DownloadMode::Snapshot => {
            let dir = root.join(SNAPSHOT_DIR);
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => tracing::info!(dir = %dir.display(), "cleared snapshot directory"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(CandelaError::persistence(format!("{}: {e}", dir.display())));
                }
            }
            Arc::new(CsvSink::flat(dir))
        }
    };

    // The call timeout already sits inside the quota layer.
    let mut fetch = cfg.fetch.clone();
    fetch.provider_timeout_ms = None;
    let candela = Candela::builder()
        .with_provider(provider)
        .with_sink(sink)
        .fetch_config(fetch)
        .build()?;

    let progress = tokio::spawn(render_progress(candela.progress()));
    let report = match cfg.mode {
        DownloadMode::History => candela.run_all(settings.jobs.clone()).await,
        DownloadMode::Snapshot => {
            let job = settings
                .jobs
                .first()
                .ok_or_else(|| CandelaError::invalid_config("no jobs configured"))?;
            candela
                .snapshot(
                    &cfg.symbols,
                    &job.timeframe,
                    job.timeframe_ms,
                    job.provider_limit,
                )
                .await
        }
    };
    progress.abort();
    print_progress(&candela.progress_snapshot());
    eprintln!();
    report
}

fn print_progress(s: &ProgressSnapshot) {
    let mut err = std::io::stderr().lock();
    let _ = write!(
        err,
        "\rLoading {}/{} requests | {} candles loaded | {}/{} jobs",
        s.requests_done, s.requests_total, s.candles, s.jobs_done, s.jobs_total
    );
    let _ = err.flush();
}

async fn render_progress(mut rx: watch::Receiver<ProgressSnapshot>) {
    while rx.changed().await.is_ok() {
        let snapshot = *rx.borrow_and_update();
        print_progress(&snapshot);
        // Coalesce bursts of updates into one redraw.
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
