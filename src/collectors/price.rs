use crate::collectors::{ensure_range, with_fallback, IndicatorCollector, IndicatorResult};
use crate::config::{FetchConfig, SourceConfig};
use crate::error::ExtractError;
use crate::fetch::{get_json_within, HttpTransport};
use crate::models::BtcMarketData;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    bitcoin: Option<CoinFields>,
}

#[derive(Debug, Deserialize)]
struct CoinFields {
    usd: Option<f64>,
    usd_24h_change: Option<f64>,
    usd_market_cap: Option<f64>,
    usd_24h_vol: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ExchangeRatesResponse {
    data: ExchangeRates,
}

#[derive(Debug, Deserialize)]
struct ExchangeRates {
    rates: HashMap<String, String>,
}

/// BTC/USD price and market data from the market-data API, with an
/// exchange-rate API as price-only fallback
pub struct PriceCollector {
    transport: Arc<dyn HttpTransport>,
    url: String,
    backup_url: Option<String>,
    timeout: Duration,
}

impl PriceCollector {
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            backup_url: None,
            timeout: FetchConfig::default().api_timeout(),
        }
    }

    pub fn from_config(
        transport: Arc<dyn HttpTransport>,
        sources: &SourceConfig,
        fetch: &FetchConfig,
    ) -> Self {
        Self::new(transport, sources.price_url.clone())
            .with_backup_url(sources.backup_price_url.clone())
            .with_timeout(fetch.api_timeout())
    }

    pub fn with_backup_url(mut self, url: impl Into<String>) -> Self {
        self.backup_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch_market_data(&self) -> IndicatorResult<BtcMarketData> {
        let body: SimplePriceResponse =
            get_json_within(self.transport.as_ref(), &self.url, self.timeout).await?;

        let coin = body
            .bitcoin
            .ok_or_else(|| ExtractError::Shape("missing `bitcoin` object".to_string()))?;
        let price = coin
            .usd
            .ok_or_else(|| ExtractError::Shape("missing `bitcoin.usd` price".to_string()))?;
        let price = ensure_range("btc_price", price, f64::MIN_POSITIVE, f64::MAX)?;

        Ok(BtcMarketData {
            price,
            change_24h: Some(coin.usd_24h_change.unwrap_or(0.0)),
            market_cap: Some(coin.usd_market_cap.unwrap_or(0.0)),
            volume: Some(coin.usd_24h_vol.unwrap_or(0.0)),
        })
    }

    async fn fetch_backup_price(&self, url: &str) -> IndicatorResult<BtcMarketData> {
        let body: ExchangeRatesResponse =
            get_json_within(self.transport.as_ref(), url, self.timeout).await?;

        let raw = body
            .data
            .rates
            .get("USD")
            .ok_or_else(|| ExtractError::Shape("missing USD rate".to_string()))?;
        let price: f64 = raw
            .parse()
            .map_err(|_| ExtractError::Shape(format!("USD rate is not numeric: {}", raw)))?;
        let price = ensure_range("btc_price", price, f64::MIN_POSITIVE, f64::MAX)?;

        Ok(BtcMarketData::price_only(price))
    }
}

#[async_trait]
impl IndicatorCollector for PriceCollector {
    type Output = BtcMarketData;

    fn name(&self) -> &'static str {
        "btc_price"
    }

    async fn collect(&self) -> IndicatorResult<BtcMarketData> {
        let data = match &self.backup_url {
            Some(backup) => {
                with_fallback(self.name(), self.fetch_market_data(), || {
                    self.fetch_backup_price(backup)
                })
                .await?
            }
            None => self.fetch_market_data().await?,
        };

        info!("BTC price collected: {}", data.price);
        Ok(data)
    }
}
