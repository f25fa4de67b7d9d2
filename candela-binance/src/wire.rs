//! Klines payload decoding and error normalization.

use std::str::FromStr;

use candela_core::{Candle, CandelaError};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::BinanceConnector;

/// Body of a rejected request, e.g. `{"code":-1121,"msg":"Invalid symbol."}`.
#[derive(Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

pub(crate) fn transport_error(e: &reqwest::Error) -> CandelaError {
    let code = e.status().map_or(-1, |s| i64::from(s.as_u16()));
    CandelaError::provider(BinanceConnector::NAME, code, e.to_string())
}

/// Prefer the exchange's own error code; fall back to the HTTP status.
pub(crate) fn api_error(status: u16, body: &str) -> CandelaError {
    match serde_json::from_str::<ApiError>(body) {
        Ok(e) => CandelaError::provider(BinanceConnector::NAME, e.code, e.msg),
        Err(_) => {
            let snippet: String = body.chars().take(200).collect();
            CandelaError::provider(
                BinanceConnector::NAME,
                i64::from(status),
                format!("HTTP {status}: {snippet}"),
            )
        }
    }
}

/// Decode `[[openTime, "open", "high", "low", "close", "volume", ...], ...]`.
pub(crate) fn parse_klines(status: u16, body: &str) -> Result<Vec<Candle>, CandelaError> {
    let rows: Vec<Vec<Value>> = serde_json::from_str(body)
        .map_err(|e| malformed(status, format!("klines payload is not an array of rows: {e}")))?;
    rows.iter().map(|row| parse_row(status, row)).collect()
}

fn parse_row(status: u16, row: &[Value]) -> Result<Candle, CandelaError> {
    if row.len() < 6 {
        return Err(malformed(
            status,
            format!("kline row has {} fields, expected at least 6", row.len()),
        ));
    }
    let ts = row[0]
        .as_i64()
        .ok_or_else(|| malformed(status, format!("bad open time {}", row[0])))?;
    Ok(Candle::new(
        ts,
        decimal(status, &row[1])?,
        decimal(status, &row[2])?,
        decimal(status, &row[3])?,
        decimal(status, &row[4])?,
        decimal(status, &row[5])?,
    ))
}

fn decimal(status: u16, v: &Value) -> Result<Decimal, CandelaError> {
    let parsed = match v {
        Value::String(s) => Decimal::from_str(s).ok(),
        Value::Number(n) => {
            let s = n.to_string();
            Decimal::from_str(&s)
                .ok()
                .or_else(|| Decimal::from_scientific(&s).ok())
        }
        _ => None,
    };
    parsed.ok_or_else(|| malformed(status, format!("bad decimal {v}")))
}

fn malformed(status: u16, message: String) -> CandelaError {
    CandelaError::provider(BinanceConnector::NAME, i64::from(status), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_with_trailing_fields_parses() {
        let body = r#"[[1499040000000,"0.01634790","0.80000000","0.01575800","0.01577100","148976.11427815",1499644799999,"2434.19055334",308,"1756.87402397","28.46694368","0"]]"#;
        let candles = parse_klines(200, body).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].ts, 1_499_040_000_000);
        assert_eq!(candles[0].high, Decimal::from_str("0.8").unwrap());
        assert_eq!(candles[0].volume, Decimal::from_str("148976.11427815").unwrap());
    }

    #[test]
    fn short_row_is_rejected() {
        let err = parse_klines(200, r#"[[1499040000000,"1","2"]]"#).unwrap_err();
        assert!(matches!(err, CandelaError::Provider { code: 200, .. }));
    }

    #[test]
    fn api_error_prefers_exchange_code() {
        let err = api_error(400, r#"{"code":-1121,"msg":"Invalid symbol."}"#);
        assert_eq!(err, CandelaError::provider("binance", -1121, "Invalid symbol."));

        let err = api_error(502, "<html>bad gateway</html>");
        assert!(matches!(err, CandelaError::Provider { code: 502, .. }));
    }
}
