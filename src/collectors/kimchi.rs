use crate::collectors::{IndicatorCollector, IndicatorResult};
use crate::config::{FetchConfig, SourceConfig};
use crate::error::ExtractError;
use crate::fetch::{FetchRacer, RaceConfig};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Premiums at or beyond this magnitude are treated as noise
pub const KIMCHI_LIMIT: f64 = 15.0;

static PERCENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-+]?\d+\.?\d*%").expect("valid percent pattern"));

/// Unrendered `{{ ... }}` template token; never spans markup
static TEMPLATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{[^{}<>]*\}\}").expect("valid template pattern"));

/// First percent figure on the exchange page with |v| < 15, skipping
/// figures inside a template token
pub fn extract_kimchi_premium(html: &str) -> Result<f64, ExtractError> {
    let tokens: Vec<_> = TEMPLATE.find_iter(html).map(|m| m.range()).collect();

    PERCENT
        .find_iter(html)
        .filter(|m| {
            !tokens
                .iter()
                .any(|t| t.start <= m.start() && m.end() <= t.end)
        })
        .filter_map(|m| m.as_str().trim_end_matches('%').parse::<f64>().ok())
        .find(|v| v.is_finite() && v.abs() < KIMCHI_LIMIT)
        .ok_or(ExtractError::PatternNotFound("kimchi premium"))
}

/// Korean exchange premium scraped through the relay racer
pub struct KimchiCollector {
    racer: Arc<FetchRacer>,
    page_url: String,
    timeout: Duration,
}

impl KimchiCollector {
    pub fn new(racer: Arc<FetchRacer>, page_url: impl Into<String>) -> Self {
        Self {
            racer,
            page_url: page_url.into(),
            timeout: FetchConfig::default().race_timeout(),
        }
    }

    pub fn from_config(racer: Arc<FetchRacer>, sources: &SourceConfig, fetch: &FetchConfig) -> Self {
        Self::new(racer, sources.kimchi_page_url.clone()).with_timeout(fetch.race_timeout())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl IndicatorCollector for KimchiCollector {
    type Output = f64;

    fn name(&self) -> &'static str {
        "kimchi_premium"
    }

    async fn collect(&self) -> IndicatorResult<f64> {
        let config = RaceConfig::new(self.name()).with_timeout(self.timeout);
        let value = self
            .racer
            .race(&self.page_url, config, extract_kimchi_premium)
            .await?;

        info!("Kimchi premium collected: {}%", value);
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::error::{CollectorError, FetchError};
    use crate::fetch::{HttpTransport, RelayRoute};

    /// Relay that always answers with one AllOrigins envelope
    struct EnvelopeTransport(String);

    #[async_trait]
    impl HttpTransport for EnvelopeTransport {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            if url.starts_with("https://api.allorigins.win/get?url=") {
                Ok(serde_json::json!({ "contents": self.0 }).to_string())
            } else {
                Err(FetchError::Network("unscripted".into()))
            }
        }
    }

    fn collector(page: &str) -> KimchiCollector {
        let racer = FetchRacer::new(
            Arc::new(EnvelopeTransport(page.to_string())),
            vec![RelayRoute::all_origins()],
            Arc::new(ResponseCache::default()),
        );
        KimchiCollector::new(Arc::new(racer), "https://coinpaprika.com/exchanges/bithumb/")
    }

    fn exchange_page(premium: &str) -> String {
        format!(
            "<html>{}<td>Volume share 38.2%</td><td class=\"premium\">{}</td></html>",
            "<tr><td>Bithumb BTC/KRW</td></tr>".repeat(4),
            premium
        )
    }

    #[tokio::test]
    async fn test_collects_premium_through_relay() {
        let collector = collector(&exchange_page("+3.25%"));
        assert_eq!(collector.collect().await, Ok(3.25));
    }

    #[tokio::test]
    async fn test_page_without_premium_fails_race() {
        let collector = collector(&exchange_page("n/a"));

        match collector.collect().await {
            Err(CollectorError::Transport(FetchError::AllRoutesFailed { indicator, reasons })) => {
                assert_eq!(indicator, "kimchi_premium");
                assert!(reasons.contains("no kimchi premium value found"), "{}", reasons);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_placeholder_excluded_and_first_candidate_taken() {
        let html = "<td>{{placeholder}}%</td><td class=\"premium\">+3.25%</td><td>1.10%</td>";
        assert_eq!(extract_kimchi_premium(html).unwrap(), 3.25);
    }

    #[test]
    fn test_figure_inside_template_token_excluded() {
        let html = "<td>{{ rate * 100 }}%</td><td>{{ 9.5% }}</td><td>-2.4%</td>";
        assert_eq!(extract_kimchi_premium(html).unwrap(), -2.4);
    }

    #[test]
    fn test_braces_in_separate_elements_do_not_hide_values() {
        assert_eq!(extract_kimchi_premium("<i>{{</i> 2.5% <i>}}</i>").unwrap(), 2.5);
    }

    #[test]
    fn test_large_percentages_skipped() {
        let html = "Volume share 38.2% ... change 15% ... premium 4.05%";
        assert_eq!(extract_kimchi_premium(html).unwrap(), 4.05);
    }

    #[test]
    fn test_no_candidate_fails() {
        assert_eq!(
            extract_kimchi_premium("<p>99.9% uptime</p>"),
            Err(ExtractError::PatternNotFound("kimchi premium"))
        );
    }
}
