use serde::{Deserialize, Serialize};

/// Price and market data for BTC/USD from one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BtcMarketData {
    pub price: f64,
    /// `None` when the source does not report the field at all
    pub change_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub volume: Option<f64>,
}

impl BtcMarketData {
    /// Price-only reading, as returned by exchange-rate sources
    pub fn price_only(price: f64) -> Self {
        Self {
            price,
            change_24h: None,
            market_cap: None,
            volume: None,
        }
    }
}

/// Fear & Greed index reading with its published label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FearGreedReading {
    pub value: u8,
    pub classification: String,
}
