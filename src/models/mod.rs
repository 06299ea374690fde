//! Domain models for the CSPI engine.
//!
//! The snapshot is the only long-lived record; everything else is produced
//! fresh by each collection cycle.

pub mod cspi;
pub mod feed_status;
pub mod market_snapshot;
pub mod readings;
pub mod sell_signal;

// Re-export all models for convenient access
pub use cspi::{CspiAssessment, CspiBreakdown, CspiLevel, Indicator};
pub use feed_status::{CspiOutlook, DataValidation, FeedStatus, RiskLabel};
pub use market_snapshot::MarketSnapshot;
pub use readings::{BtcMarketData, FearGreedReading};
pub use sell_signal::{SellSignal, SellSignals};
