//! candela-binance
//!
//! Public connector that implements `FetchWindow` on top of the Binance
//! `GET /api/v3/klines` endpoint. No API key is required.
#![warn(missing_docs)]

mod builder;
mod wire;

use async_trait::async_trait;
use candela_core::{Candle, CandelaError, FetchWindow};
use url::Url;

pub use builder::BinanceConnectorBuilder;

/// Binance klines connector.
pub struct BinanceConnector {
    http: reqwest::Client,
    base_url: Url,
}

impl BinanceConnector {
    /// Provider name used in errors and output paths.
    pub const NAME: &'static str = "binance";

    /// Production REST endpoint.
    pub const DEFAULT_BASE_URL: &'static str = "https://api.binance.com";

    /// Build against the production endpoint with a fresh HTTP client.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the HTTP client cannot be constructed.
    pub fn new_default() -> Result<Self, CandelaError> {
        Self::with_base_url(Self::DEFAULT_BASE_URL)
    }

    /// Build against another endpoint (a regional mirror, a test server).
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `base_url` is not a valid URL or the
    /// HTTP client cannot be constructed.
    pub fn with_base_url(base_url: &str) -> Result<Self, CandelaError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("candela/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| CandelaError::invalid_config(format!("http client: {e}")))?;
        Self::with_client(http, base_url)
    }

    /// Build from an existing `reqwest::Client`.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if `base_url` is not a valid URL.
    pub fn with_client(http: reqwest::Client, base_url: &str) -> Result<Self, CandelaError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            CandelaError::invalid_config(format!("invalid base url '{base_url}': {e}"))
        })?;
        Ok(Self { http, base_url })
    }

    /// Exchange market id for a unified symbol: `BTC/USDT` -> `BTCUSDT`.
    #[must_use]
    pub fn market_id(symbol: &str) -> String {
        symbol.replace('/', "").to_ascii_uppercase()
    }

    fn klines_url(
        &self,
        symbol: &str,
        interval: &str,
        since: i64,
        limit: u32,
    ) -> Result<Url, CandelaError> {
        let mut url = self.base_url.join("/api/v3/klines").map_err(|e| {
            CandelaError::invalid_config(format!("cannot build klines url: {e}"))
        })?;
        url.query_pairs_mut()
            .append_pair("symbol", &Self::market_id(symbol))
            .append_pair("interval", interval)
            .append_pair("startTime", &since.to_string())
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela_binance::fetch_klines",
            skip(self),
            fields(provider = Self::NAME),
        )
    )]
    async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        since: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, CandelaError> {
        let url = self.klines_url(symbol, interval, since, limit)?;
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| wire::transport_error(&e))?;
        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| wire::transport_error(&e))?;
        if !(200..300).contains(&status) {
            let err = wire::api_error(status, &body);
            #[cfg(feature = "tracing")]
            tracing::debug!(status, error = %err, "binance rejected klines request");
            return Err(err);
        }
        wire::parse_klines(status, &body)
    }
}

#[async_trait]
impl FetchWindow for BinanceConnector {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn fetch_window(
        &self,
        symbol: &str,
        timeframe: &str,
        since: i64,
        limit: u32,
    ) -> Result<Vec<Candle>, CandelaError> {
        self.fetch_klines(symbol, timeframe, since, limit).await
    }
}
