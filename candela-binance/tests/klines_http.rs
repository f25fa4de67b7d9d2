use candela_binance::BinanceConnector;
use candela_core::{CandelaError, Decimal, FetchWindow};
use httpmock::prelude::*;
use serde_json::json;

#[tokio::test]
async fn request_carries_market_id_interval_since_and_limit() {
    let server = MockServer::start_async().await;
    let m = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v3/klines")
                .query_param("symbol", "BTCUSDT")
                .query_param("interval", "1h")
                .query_param("startTime", "1496275200000")
                .query_param("limit", "1000");
            then.status(200).json_body(json!([
                [1_496_275_200_000_i64, "2300.0", "2310.5", "2290.1", "2305.2", "12.5", 1_496_278_799_999_i64, "0", 10, "0", "0", "0"],
                [1_496_278_800_000_i64, "2305.2", "2320.0", "2300.0", "2318.9", "8.25", 1_496_282_399_999_i64, "0", 7, "0", "0", "0"]
            ]));
        })
        .await;

    let conn = BinanceConnector::with_base_url(&server.base_url()).unwrap();
    let candles = conn
        .fetch_window("BTC/USDT", "1h", 1_496_275_200_000, 1000)
        .await
        .unwrap();

    m.assert_async().await;
    assert_eq!(candles.len(), 2);
    assert_eq!(candles[0].ts, 1_496_275_200_000);
    assert_eq!(candles[1].close, Decimal::new(23_189, 1));
    assert_eq!(candles[1].volume, Decimal::new(825, 2));
}

#[tokio::test]
async fn empty_array_is_an_empty_batch() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/klines");
            then.status(200).json_body(json!([]));
        })
        .await;

    let conn = BinanceConnector::with_base_url(&server.base_url()).unwrap();
    let candles = conn.fetch_window("ETH/BTC", "1d", 0, 1000).await.unwrap();
    assert!(candles.is_empty());
}

#[tokio::test]
async fn exchange_error_code_is_preserved() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/klines");
            then.status(400)
                .json_body(json!({ "code": -1121, "msg": "Invalid symbol." }));
        })
        .await;

    let conn = BinanceConnector::with_base_url(&server.base_url()).unwrap();
    let err = conn.fetch_window("NOPE/USDT", "1h", 0, 10).await.unwrap_err();
    assert_eq!(
        err,
        CandelaError::provider("binance", -1121, "Invalid symbol.")
    );
    assert!(err.is_retryable());
}

#[tokio::test]
async fn non_json_failure_maps_to_http_status() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v3/klines");
            then.status(429).body("Too many requests");
        })
        .await;

    let conn = BinanceConnector::with_base_url(&server.base_url()).unwrap();
    let err = conn.fetch_window("BTC/USDT", "1m", 0, 10).await.unwrap_err();
    assert!(matches!(err, CandelaError::Provider { code: 429, .. }));
}

#[test]
fn market_id_strips_slash() {
    assert_eq!(BinanceConnector::market_id("BTC/USDT"), "BTCUSDT");
    assert_eq!(BinanceConnector::market_id("eth/btc"), "ETHBTC");
}

#[test]
fn invalid_base_url_is_configuration_error() {
    assert!(matches!(
        BinanceConnector::with_base_url("not a url"),
        Err(CandelaError::InvalidConfiguration(_))
    ));
}

#[test]
fn rate_limited_builder_stacks_quota_over_timeout() {
    let builder = BinanceConnector::rate_limited().unwrap();
    let names: Vec<String> = builder.describe().into_iter().map(|(n, _)| n).collect();
    assert_eq!(names, vec!["QuotaAwareProvider", "TimeoutProvider", "RawProvider"]);

    let wrapped = builder.build();
    assert_eq!(wrapped.name(), "binance");
}
