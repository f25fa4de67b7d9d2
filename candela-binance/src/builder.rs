use std::sync::Arc;
use std::time::Duration;

use candela_core::{CandelaError, FetchWindow, QuotaConfig, QuotaConsumptionStrategy};
use candela_middleware::ProviderBuilder;

use crate::BinanceConnector;

/// Builder type alias specialized for Binance connectors.
pub type BinanceConnectorBuilder = ProviderBuilder;

impl BinanceConnector {
    /// Returns an unconfigured builder with the default connector.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the HTTP client cannot be constructed.
    pub fn builder() -> Result<BinanceConnectorBuilder, CandelaError> {
        let raw: Arc<dyn FetchWindow> = Arc::new(Self::new_default()?);
        Ok(ProviderBuilder::new(raw))
    }

    /// Returns a builder with a conservative request budget and a per-call timeout.
    ///
    /// 1200 requests per minute spread evenly (50 every 2.5 s), 10 s per call.
    /// Users can further customize before calling `.build()`.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the HTTP client cannot be constructed.
    pub fn rate_limited() -> Result<BinanceConnectorBuilder, CandelaError> {
        Ok(Self::builder()?
            .with_timeout(Duration::from_secs(10))
            .with_quota(&Self::default_quota()))
    }

    /// Quota used by [`rate_limited`](Self::rate_limited).
    #[must_use]
    pub fn default_quota() -> QuotaConfig {
        QuotaConfig {
            limit: 1200,
            window_ms: 60_000,
            strategy: QuotaConsumptionStrategy::EvenSpread,
        }
    }
}
