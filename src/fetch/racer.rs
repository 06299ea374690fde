use crate::cache::ResponseCache;
use crate::config::FetchConfig;
use crate::error::{ExtractError, FetchError};
use crate::fetch::relay::RelayRoute;
use crate::fetch::transport::{get_text_within, HttpTransport};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Per-call settings for a relay race
#[derive(Debug, Clone, Copy)]
pub struct RaceConfig<'a> {
    /// Logical indicator name, used for the cache key and error messages
    pub name: &'a str,
    /// Overrides the racer's default per-attempt timeout
    pub timeout: Option<Duration>,
}

impl<'a> RaceConfig<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Fetches a page through every relay route at once and adopts the first
/// attempt that yields a usable value.
///
/// Losing attempts are dropped as soon as a winner is found. Attempts only
/// produce values; the cache is written from the winning path alone.
pub struct FetchRacer {
    transport: Arc<dyn HttpTransport>,
    routes: Vec<RelayRoute>,
    cache: Arc<ResponseCache<f64>>,
    default_timeout: Duration,
    min_payload_len: usize,
}

impl FetchRacer {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        routes: Vec<RelayRoute>,
        cache: Arc<ResponseCache<f64>>,
    ) -> Self {
        let defaults = FetchConfig::default();
        Self {
            transport,
            routes,
            cache,
            default_timeout: defaults.race_timeout(),
            min_payload_len: defaults.min_payload_len,
        }
    }

    pub fn from_config(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<ResponseCache<f64>>,
        config: &FetchConfig,
    ) -> Self {
        Self::new(transport, config.relay_routes.clone(), cache)
            .with_default_timeout(config.race_timeout())
            .with_min_payload_len(config.min_payload_len)
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn with_min_payload_len(mut self, len: usize) -> Self {
        self.min_payload_len = len;
        self
    }

    pub fn routes(&self) -> &[RelayRoute] {
        &self.routes
    }

    /// Race `target` through all relay routes and extract a value from the
    /// first usable payload
    pub async fn race<F>(
        &self,
        target: &str,
        config: RaceConfig<'_>,
        extract: F,
    ) -> Result<f64, FetchError>
    where
        F: Fn(&str) -> Result<f64, ExtractError> + Sync,
    {
        let cache_key = ResponseCache::<f64>::key(config.name, target);
        if let Some(hit) = self.cache.get(&cache_key) {
            info!("{} cache hit", config.name);
            return Ok(hit);
        }

        let timeout = config.timeout.unwrap_or(self.default_timeout);
        let extract = &extract;

        let mut attempts: FuturesUnordered<_> = self
            .routes
            .iter()
            .map(|route| async move {
                let outcome = self.attempt(route, target, timeout, extract).await;
                (route, outcome)
            })
            .collect();

        let mut reasons = Vec::new();
        while let Some((route, outcome)) = attempts.next().await {
            match outcome {
                Ok(value) => {
                    info!("{} won via {}: {}", config.name, route, value);
                    // remaining attempts are cancelled when `attempts` drops
                    self.cache.put(cache_key, value);
                    return Ok(value);
                }
                Err(reason) => {
                    warn!("{} via {} failed: {}", config.name, route, reason);
                    reasons.push(format!("{}: {}", route, reason));
                }
            }
        }

        if reasons.is_empty() {
            reasons.push("no relay routes configured".to_string());
        }

        Err(FetchError::AllRoutesFailed {
            indicator: config.name.to_string(),
            reasons: reasons.join("; "),
        })
    }

    async fn attempt<F>(
        &self,
        route: &RelayRoute,
        target: &str,
        timeout: Duration,
        extract: &F,
    ) -> Result<f64, String>
    where
        F: Fn(&str) -> Result<f64, ExtractError> + Sync,
    {
        let relay_url = route.wrap(target);
        debug!("requesting {} via {}", target, route);

        let body = get_text_within(self.transport.as_ref(), &relay_url, timeout)
            .await
            .map_err(|e| e.to_string())?;
        let page = route.unwrap_payload(body).map_err(|e| e.to_string())?;

        if page.chars().count() < self.min_payload_len {
            return Err(FetchError::PayloadTooShort {
                len: page.chars().count(),
            }
            .to_string());
        }

        debug!("{} delivered {} chars", route, page.len());
        extract(&page).map_err(|e| e.to_string())
    }
}
