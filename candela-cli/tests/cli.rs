use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;

const DAY: i64 = 86_400_000;
/// 01-06-2017 00:00 UTC.
const JUNE_2017: i64 = 1_496_275_200_000;

fn write_config(dir: &Path, download: &serde_json::Value) {
    fs::write(dir.join("download.json"), download.to_string()).unwrap();
}

fn candela(config_dir: &Path, base_url: &str) -> Command {
    let mut cmd = Command::cargo_bin("candela").unwrap();
    cmd.env("CANDELA_CONFIG_DIR", config_dir)
        .env("CANDELA_BINANCE_URL", base_url)
        .env_remove("RUST_LOG");
    cmd
}

fn kline(ts: i64, close: &str) -> serde_json::Value {
    json!([ts, "1.0", "2.0", "0.5", close, "10", ts + DAY - 1, "0", 1, "0", "0", "0"])
}

#[test]
fn missing_configuration_exits_with_status_two() {
    let dir = tempfile::tempdir().unwrap();
    candela(dir.path(), "http://127.0.0.1:9")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("download.json"));
}

#[test]
fn unsupported_provider_exits_with_status_two() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        &json!({
            "provider": "kucoin",
            "symbols": ["BTC/USDT"],
            "timeframes": ["1d"],
            "start_date": "01-06-2017",
            "output_dir": dir.path().join("out"),
        }),
    );
    candela(dir.path(), "http://127.0.0.1:9")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported provider"));
}

#[test]
fn malformed_start_date_exits_with_status_two() {
    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        &json!({
            "provider": "binance",
            "symbols": ["BTC/USDT"],
            "timeframes": ["1d"],
            "start_date": "2017-06-01",
        }),
    );
    candela(dir.path(), "http://127.0.0.1:9").assert().code(2);
}

#[test]
fn downloads_history_into_nested_csv_layout() {
    let server = MockServer::start();
    let klines = server.mock(|when, then| {
        when.method(GET)
            .path("/api/v3/klines")
            .query_param("symbol", "BTCUSDT")
            .query_param("interval", "1d");
        then.status(200).json_body(json!([
            kline(JUNE_2017, "1.5"),
            kline(JUNE_2017 + DAY, "1.6"),
        ]));
    });

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    write_config(
        dir.path(),
        &json!({
            "provider": "binance",
            "symbols": ["BTC/USDT"],
            "timeframes": ["1d"],
            "start_date": "01-06-2017",
            "output_dir": out,
        }),
    );

    candela(dir.path(), &server.base_url())
        .assert()
        .success()
        .stdout(predicate::str::contains("1/1 jobs succeeded"))
        .stderr(predicate::str::contains("candles loaded"));

    assert!(klines.hits() >= 1);
    let csv = fs::read_to_string(out.join("binance").join("1d").join("BTC-USDT.csv")).unwrap();
    assert_eq!(
        csv,
        "date,open,high,low,close,volume\n\
         2017-06-01 00:00:00,1.0,2.0,0.5,1.5,10\n\
         2017-06-02 00:00:00,1.0,2.0,0.5,1.6,10\n"
    );
}

#[test]
fn failing_jobs_still_exit_successfully() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/api/v3/klines");
        then.status(503).body("maintenance");
    });

    let dir = tempfile::tempdir().unwrap();
    write_config(
        dir.path(),
        &json!({
            "provider": "binance",
            "symbols": ["BTC/USDT", "ETH/USDT"],
            "timeframes": ["1w"],
            "start_date": "01-06-2017",
            "output_dir": dir.path().join("out"),
        }),
    );

    candela(dir.path(), &server.base_url())
        .assert()
        .success()
        .stdout(predicate::str::contains("0/2 jobs succeeded"))
        .stdout(predicate::str::contains("failed BTC/USDT 1w"))
        .stdout(predicate::str::contains("failed ETH/USDT 1w"));
}

#[test]
fn snapshot_mode_replaces_the_quick_analysis_directory() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET)
            .path("/api/v3/klines")
            .query_param("limit", "1000");
        then.status(200)
            .json_body(json!([kline(JUNE_2017, "1.5")]));
    });

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let quick = out.join("quick_analysis");
    fs::create_dir_all(&quick).unwrap();
    fs::write(quick.join("OLD-USDT.csv"), "stale").unwrap();
    write_config(
        dir.path(),
        &json!({
            "provider": "binance",
            "symbols": ["SOL/USDT"],
            "timeframes": ["1h"],
            "start_date": "01-06-2017",
            "output_dir": out,
            "mode": "snapshot",
        }),
    );

    candela(dir.path(), &server.base_url()).assert().success();

    let mut names: Vec<String> = fs::read_dir(&quick)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["SOL-USDT.csv"]);
}
