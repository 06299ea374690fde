use crate::collectors::{ensure_range, IndicatorCollector, IndicatorResult};
use crate::config::{FetchConfig, SourceConfig};
use crate::error::ExtractError;
use crate::fetch::{get_json_within, HttpTransport};
use crate::models::FearGreedReading;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Deserialize)]
struct FearGreedResponse {
    #[serde(default)]
    data: Vec<FearGreedEntry>,
}

#[derive(Debug, Deserialize)]
struct FearGreedEntry {
    value: String,
    value_classification: String,
}

/// Latest Fear & Greed index reading
pub struct FearGreedCollector {
    transport: Arc<dyn HttpTransport>,
    url: String,
    timeout: Duration,
}

impl FearGreedCollector {
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>) -> Self {
        Self {
            transport,
            url: url.into(),
            timeout: FetchConfig::default().api_timeout(),
        }
    }

    pub fn from_config(
        transport: Arc<dyn HttpTransport>,
        sources: &SourceConfig,
        fetch: &FetchConfig,
    ) -> Self {
        Self::new(transport, sources.fear_greed_url.clone()).with_timeout(fetch.api_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl IndicatorCollector for FearGreedCollector {
    type Output = FearGreedReading;

    fn name(&self) -> &'static str {
        "fear_greed"
    }

    async fn collect(&self) -> IndicatorResult<FearGreedReading> {
        let body: FearGreedResponse =
            get_json_within(self.transport.as_ref(), &self.url, self.timeout).await?;

        let latest = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ExtractError::Shape("empty `data` array".to_string()))?;

        let value: i64 = latest
            .value
            .trim()
            .parse()
            .map_err(|_| ExtractError::Shape(format!("non-integer value: {}", latest.value)))?;
        let value = ensure_range(self.name(), value as f64, 0.0, 100.0)? as u8;

        info!("Fear & Greed collected: {} ({})", value, latest.value_classification);
        Ok(FearGreedReading {
            value,
            classification: latest.value_classification,
        })
    }
}
