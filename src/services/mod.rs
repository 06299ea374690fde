pub mod cspi_calculator;
pub mod market_service;
pub mod sell_signals;

pub use cspi_calculator::{calculate_cspi_score, classify, normalize, score_indicators};
pub use market_service::{CollectionReport, Collectors, MarketDataService};
pub use sell_signals::{evaluate_sell_signals, sell_signals_for};
