use crate::collectors::{ensure_range, with_fallback, IndicatorCollector, IndicatorResult};
use crate::config::{FetchConfig, SourceConfig};
use crate::error::{CollectorError, ExtractError};
use crate::fetch::{get_json_within, FetchRacer, HttpTransport, RaceConfig};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub const MVRV_MIN: f64 = -5.0;
pub const MVRV_MAX: f64 = 15.0;

/// Tried in order; the first in-range match wins
static MVRV_PATTERNS: Lazy<[Regex; 2]> = Lazy::new(|| {
    [
        Regex::new(r#"(?i)class="val"[^>]*?>(-?\d+\.?\d*)<"#).expect("valid mvrv pattern"),
        Regex::new(r#"(?i)"val"[^>]*?>(-?\d+\.?\d*)<"#).expect("valid mvrv pattern"),
    ]
});

/// Pull the MVRV Z-score out of a chart page's markup
pub fn extract_mvrv(html: &str) -> Result<f64, ExtractError> {
    MVRV_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.captures_iter(html))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .find(|v| v.is_finite() && (MVRV_MIN..=MVRV_MAX).contains(v))
        .ok_or(ExtractError::PatternNotFound("mvrv"))
}

#[derive(Debug, Deserialize)]
struct ServiceResponse {
    success: bool,
    data: Option<ServiceData>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ServiceData {
    #[serde(alias = "mvrv_z_score")]
    valuation_ratio: Option<f64>,
}

/// MVRV Z-score from the companion service, falling back to scraping the
/// chart page through the relay racer
pub struct MvrvCollector {
    transport: Arc<dyn HttpTransport>,
    racer: Arc<FetchRacer>,
    service_url: String,
    service_timeout: Duration,
    page_url: String,
    page_timeout: Duration,
}

impl MvrvCollector {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        racer: Arc<FetchRacer>,
        service_url: impl Into<String>,
        page_url: impl Into<String>,
    ) -> Self {
        let defaults = FetchConfig::default();
        Self {
            transport,
            racer,
            service_url: service_url.into(),
            service_timeout: defaults.mvrv_service_timeout(),
            page_url: page_url.into(),
            page_timeout: defaults.mvrv_page_timeout(),
        }
    }

    pub fn from_config(
        transport: Arc<dyn HttpTransport>,
        racer: Arc<FetchRacer>,
        sources: &SourceConfig,
        fetch: &FetchConfig,
    ) -> Self {
        let mut collector = Self::new(
            transport,
            racer,
            sources.mvrv_service_url.clone(),
            sources.mvrv_page_url.clone(),
        );
        collector.service_timeout = fetch.mvrv_service_timeout();
        collector.page_timeout = fetch.mvrv_page_timeout();
        collector
    }

    async fn query_service(&self) -> IndicatorResult<f64> {
        let body: ServiceResponse =
            get_json_within(self.transport.as_ref(), &self.service_url, self.service_timeout)
                .await?;

        if !body.success {
            return Err(CollectorError::Service(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let value = body
            .data
            .and_then(|d| d.valuation_ratio)
            .ok_or_else(|| ExtractError::Shape("missing valuation_ratio".to_string()))?;

        Ok(ensure_range(self.name(), value, MVRV_MIN, MVRV_MAX)?)
    }

    async fn scrape_page(&self) -> IndicatorResult<f64> {
        let config = RaceConfig::new("mvrv_page").with_timeout(self.page_timeout);
        Ok(self.racer.race(&self.page_url, config, extract_mvrv).await?)
    }
}

#[async_trait]
impl IndicatorCollector for MvrvCollector {
    type Output = f64;

    fn name(&self) -> &'static str {
        "mvrv"
    }

    async fn collect(&self) -> IndicatorResult<f64> {
        let value = with_fallback(self.name(), self.query_service(), || self.scrape_page()).await?;
        info!("MVRV Z-score collected: {}", value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::error::FetchError;
    use crate::fetch::RelayRoute;

    const SERVICE: &str = "http://localhost:3001/api/mvrv";
    const PAGE: &str = "https://en.macromicro.me/charts/30335/bitcoin-mvrv-zscore";

    /// Responses keyed by URL prefix
    struct ScriptedTransport(Vec<(&'static str, Result<String, FetchError>)>);

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.0
                .iter()
                .find(|(prefix, _)| url.starts_with(prefix))
                .map(|(_, result)| result.clone())
                .unwrap_or_else(|| Err(FetchError::Network("unscripted".into())))
        }
    }

    fn chart_envelope(value: &str) -> String {
        let page = format!(
            "<html>{}<div class=\"stat\"><span class=\"val\">{}</span></div></html>",
            "<p>MVRV Z-Score chart</p>".repeat(5),
            value
        );
        serde_json::json!({ "contents": page }).to_string()
    }

    fn collector(service: Result<&str, u16>, relay: Result<String, u16>) -> MvrvCollector {
        let status = |url: &str, status: u16| FetchError::Status {
            url: url.to_string(),
            status,
        };
        let relay_prefix = "https://api.allorigins.win/get?url=";
        let transport = Arc::new(ScriptedTransport(vec![
            (SERVICE, service.map(str::to_string).map_err(|s| status(SERVICE, s))),
            (relay_prefix, relay.map_err(|s| status(relay_prefix, s))),
        ]));
        let racer = Arc::new(FetchRacer::new(
            transport.clone(),
            vec![RelayRoute::all_origins()],
            Arc::new(ResponseCache::default()),
        ));
        MvrvCollector::new(transport, racer, SERVICE, PAGE)
    }

    #[tokio::test]
    async fn test_service_value_used_when_available() {
        let collector = collector(
            Ok(r#"{"success":true,"data":{"valuation_ratio":2.4}}"#),
            Ok(chart_envelope("7.1")),
        );
        assert_eq!(collector.collect().await, Ok(2.4));
    }

    #[tokio::test]
    async fn test_service_failure_falls_back_to_relayed_page() {
        let collector = collector(
            Ok(r#"{"success":false,"error":"browser crashed"}"#),
            Ok(chart_envelope("7.1")),
        );
        assert_eq!(collector.collect().await, Ok(7.1));
    }

    #[tokio::test]
    async fn test_missing_service_value_falls_back() {
        let collector = collector(Ok(r#"{"success":true,"data":{}}"#), Ok(chart_envelope("3.3")));
        assert_eq!(collector.collect().await, Ok(3.3));
    }

    #[tokio::test]
    async fn test_out_of_range_service_value_falls_back() {
        let collector = collector(
            Ok(r#"{"success":true,"data":{"valuation_ratio":42.0}}"#),
            Ok(chart_envelope("6.2")),
        );
        assert_eq!(collector.collect().await, Ok(6.2));
    }

    #[tokio::test]
    async fn test_both_tiers_failing_reports_both() {
        let collector = collector(Ok(r#"{"success":false,"error":"browser crashed"}"#), Err(502));

        let err = collector.collect().await.unwrap_err();
        assert!(matches!(err, CollectorError::Fallback { indicator: "mvrv", .. }));

        let msg = err.to_string();
        assert!(msg.contains("service reported failure: browser crashed"), "{}", msg);
        assert!(msg.contains("all relay routes failed - mvrv_page"), "{}", msg);
        assert!(msg.contains("HTTP 502"), "{}", msg);
    }

    #[test]
    fn test_extracts_value_in_range() {
        assert_eq!(extract_mvrv(r#"<div class="val">7.1</div>"#).unwrap(), 7.1);
        assert_eq!(extract_mvrv(r#"<span class="val" data-x="1">-0.42</span>"#).unwrap(), -0.42);
    }

    #[test]
    fn test_out_of_range_yields_no_candidate() {
        assert_eq!(
            extract_mvrv(r#"<div class="val">42</div>"#),
            Err(ExtractError::PatternNotFound("mvrv"))
        );
    }

    #[test]
    fn test_skips_out_of_range_and_takes_next_match() {
        let html = r#"<b class="val">120.5</b> ... <b class="val">3.3</b>"#;
        assert_eq!(extract_mvrv(html).unwrap(), 3.3);
    }

    #[test]
    fn test_second_pattern_used_when_first_misses() {
        let html = r#"{"cls":"val">2.25<"#;
        assert_eq!(extract_mvrv(html).unwrap(), 2.25);
    }

    #[test]
    fn test_service_payload_accepts_both_field_names() {
        let a: ServiceResponse =
            serde_json::from_str(r#"{"success":true,"data":{"valuation_ratio":1.9}}"#).unwrap();
        let b: ServiceResponse =
            serde_json::from_str(r#"{"success":true,"data":{"mvrv_z_score":2.1}}"#).unwrap();
        assert_eq!(a.data.unwrap().valuation_ratio, Some(1.9));
        assert_eq!(b.data.unwrap().valuation_ratio, Some(2.1));
    }
}
