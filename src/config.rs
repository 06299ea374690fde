use crate::fetch::RelayRoute;
use std::env;
use std::time::Duration;

/// Upstream endpoints for every indicator source
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub price_url: String,
    pub backup_price_url: String,
    pub fear_greed_url: String,
    pub mvrv_service_url: String,
    pub mvrv_page_url: String,
    pub kimchi_page_url: String,
}

/// Timeouts and relay settings for outbound requests
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub race_timeout_ms: u64,
    pub mvrv_page_timeout_ms: u64,
    pub mvrv_service_timeout_ms: u64,
    pub api_timeout_ms: u64,
    pub min_payload_len: usize,
    pub relay_routes: Vec<RelayRoute>,
    pub user_agent: String,
}

/// Response cache bounds
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub capacity: usize,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub sources: SourceConfig,
    pub fetch: FetchConfig,
    pub cache: CacheConfig,
    pub log_level: String,
    pub environment: String,
    pub ws_port: Option<u16>,
    pub refresh_on_start: bool,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, String> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

impl SourceConfig {
    /// Create source config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            price_url: env_or("PRICE_API_URL", &defaults.price_url),
            backup_price_url: env_or("BACKUP_PRICE_API_URL", &defaults.backup_price_url),
            fear_greed_url: env_or("FEAR_GREED_API_URL", &defaults.fear_greed_url),
            mvrv_service_url: env_or("MVRV_SERVICE_URL", &defaults.mvrv_service_url),
            mvrv_page_url: env_or("MVRV_PAGE_URL", &defaults.mvrv_page_url),
            kimchi_page_url: env_or("KIMCHI_PAGE_URL", &defaults.kimchi_page_url),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            price_url: "https://api.coingecko.com/api/v3/simple/price?ids=bitcoin&vs_currencies=usd&include_24hr_change=true&include_market_cap=true&include_24hr_vol=true".to_string(),
            backup_price_url: "https://api.coinbase.com/v2/exchange-rates?currency=BTC".to_string(),
            fear_greed_url: "https://api.alternative.me/fng/".to_string(),
            mvrv_service_url: "http://localhost:3001/api/mvrv".to_string(),
            mvrv_page_url: "https://en.macromicro.me/charts/30335/bitcoin-mvrv-zscore".to_string(),
            kimchi_page_url: "https://coinpaprika.com/exchanges/bithumb/".to_string(),
        }
    }
}

impl FetchConfig {
    /// Create fetch config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();

        let race_timeout_ms = env_parsed("RACE_TIMEOUT_MS", defaults.race_timeout_ms)?;
        let mvrv_page_timeout_ms = env_parsed("MVRV_PAGE_TIMEOUT_MS", defaults.mvrv_page_timeout_ms)?;
        let mvrv_service_timeout_ms =
            env_parsed("MVRV_SERVICE_TIMEOUT_MS", defaults.mvrv_service_timeout_ms)?;
        let api_timeout_ms = env_parsed("API_TIMEOUT_MS", defaults.api_timeout_ms)?;
        let min_payload_len = env_parsed("MIN_PAYLOAD_LEN", defaults.min_payload_len)?;

        let relay_routes = match env::var("RELAY_ROUTES") {
            Ok(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<RelayRoute>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| format!("RELAY_ROUTES: {}", e))?,
            Err(_) => defaults.relay_routes,
        };

        // Validate configuration
        for (key, value) in [
            ("RACE_TIMEOUT_MS", race_timeout_ms),
            ("MVRV_PAGE_TIMEOUT_MS", mvrv_page_timeout_ms),
            ("MVRV_SERVICE_TIMEOUT_MS", mvrv_service_timeout_ms),
            ("API_TIMEOUT_MS", api_timeout_ms),
        ] {
            if value == 0 {
                return Err(format!("{} must be greater than 0", key));
            }
        }

        if relay_routes.is_empty() {
            return Err("RELAY_ROUTES must name at least one route".to_string());
        }

        Ok(Self {
            race_timeout_ms,
            mvrv_page_timeout_ms,
            mvrv_service_timeout_ms,
            api_timeout_ms,
            min_payload_len,
            relay_routes,
            user_agent: env_or("FETCH_USER_AGENT", &defaults.user_agent),
        })
    }

    /// Default timeout for a relay race
    pub fn race_timeout(&self) -> Duration {
        Duration::from_millis(self.race_timeout_ms)
    }

    pub fn mvrv_page_timeout(&self) -> Duration {
        Duration::from_millis(self.mvrv_page_timeout_ms)
    }

    pub fn mvrv_service_timeout(&self) -> Duration {
        Duration::from_millis(self.mvrv_service_timeout_ms)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            race_timeout_ms: 6000,
            mvrv_page_timeout_ms: 10000,
            mvrv_service_timeout_ms: 15000,
            api_timeout_ms: 10000,
            min_payload_len: 100,
            relay_routes: vec![RelayRoute::all_origins()],
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string(),
        }
    }
}

impl CacheConfig {
    /// Create cache config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let ttl_secs = env_parsed("CACHE_TTL_SECS", defaults.ttl_secs)?;
        let capacity = env_parsed("CACHE_CAPACITY", defaults.capacity)?;

        if capacity == 0 {
            return Err("CACHE_CAPACITY must be greater than 0".to_string());
        }

        Ok(Self { ttl_secs, capacity })
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            capacity: 50,
        }
    }
}

impl AppConfig {
    /// Create application config from environment variables
    pub fn from_env() -> Result<Self, String> {
        let sources = SourceConfig::from_env();
        let fetch = FetchConfig::from_env()?;
        let cache = CacheConfig::from_env()?;

        let log_level = env_or("LOG_LEVEL", "info");
        let environment = env_or("ENVIRONMENT", "development");

        let ws_port = match env::var("WS_PORT") {
            Ok(raw) => Some(
                raw.parse::<u16>()
                    .map_err(|_| format!("WS_PORT has an invalid value: {}", raw))?,
            ),
            Err(_) => None,
        };

        let refresh_on_start = env_parsed("REFRESH_ON_START", false)?;

        // Validate log level
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&log_level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid LOG_LEVEL: {}. Must be one of: {:?}",
                log_level, valid_log_levels
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&environment.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid ENVIRONMENT: {}. Must be one of: {:?}",
                environment, valid_environments
            ));
        }

        Ok(Self {
            sources,
            fetch,
            cache,
            log_level: log_level.to_lowercase(),
            environment: environment.to_lowercase(),
            ws_port,
            refresh_on_start,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Check if running in development
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: SourceConfig::default(),
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            log_level: "info".to_string(),
            environment: "development".to_string(),
            ws_port: None,
            refresh_on_start: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.race_timeout(), Duration::from_millis(6000));
        assert_eq!(config.mvrv_service_timeout(), Duration::from_millis(15000));
        assert_eq!(config.min_payload_len, 100);
        assert_eq!(config.relay_routes.len(), 1);
    }

    #[test]
    fn test_cache_config_default() {
        let config = CacheConfig::default();
        assert_eq!(config.ttl(), Duration::from_secs(60));
        assert_eq!(config.capacity, 50);
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();
        assert!(config.is_development());
        assert!(!config.is_production());
        assert!(config.ws_port.is_none());
        assert!(!config.refresh_on_start);
    }
}
