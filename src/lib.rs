//! CSPI Backend Library
//!
//! Composite sentiment engine for Bitcoin: indicator collectors, relay
//! fetching, scoring and the presentation feed. Exposed for tests and
//! other consumers.

pub mod cache;
pub mod collectors;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod services;
pub mod state_manager;
pub mod websocket;

// Re-export commonly used types
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use services::{CollectionReport, Collectors, MarketDataService};
pub use state_manager::{MarketEvent, MarketState};

use fetch::{HttpTransport, ReqwestTransport};
use std::sync::Arc;

/// Build the production engine: HTTP collectors over a shared transport
pub fn build_service(config: &AppConfig) -> AppResult<Arc<MarketDataService>> {
    let transport: Arc<dyn HttpTransport> = Arc::new(
        ReqwestTransport::new(&config.fetch)
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?,
    );
    let collectors = Collectors::from_config(config, transport);
    let state = Arc::new(MarketState::new());

    Ok(Arc::new(MarketDataService::new(collectors, state)))
}
