use crate::models::market_snapshot::MarketSnapshot;
use serde::{Deserialize, Serialize};

/// Connection state of one data panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Connected,
    Partial,
    Loading,
}

/// Validation panel state derived from a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataValidation {
    pub price: FeedStatus,
    pub cspi: FeedStatus,
    pub indicators: FeedStatus,
    pub connected_indicators: usize,
    pub data_feed: FeedStatus,
}

impl DataValidation {
    pub fn from_snapshot(snapshot: &MarketSnapshot) -> Self {
        let connected = snapshot.connected_indicators();

        let present = |is_some: bool| {
            if is_some {
                FeedStatus::Connected
            } else {
                FeedStatus::Loading
            }
        };

        let indicators = match connected {
            6 => FeedStatus::Connected,
            0 => FeedStatus::Loading,
            _ => FeedStatus::Partial,
        };

        let data_feed = match connected {
            0 => FeedStatus::Loading,
            n if n >= 4 => FeedStatus::Connected,
            _ => FeedStatus::Partial,
        };

        Self {
            price: present(snapshot.btc_price.is_some()),
            cspi: present(snapshot.cspi_score.is_some()),
            indicators,
            connected_indicators: connected,
            data_feed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLabel {
    Low,
    Moderate,
}

/// Cycle-position summary shown under the gauge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CspiOutlook {
    /// Percent of the way to a cycle peak
    pub progress_to_peak: f64,
    /// Points left before 100
    pub remaining_upside: f64,
    pub risk: RiskLabel,
}

impl CspiOutlook {
    pub fn from_score(score: Option<f64>) -> Option<Self> {
        let score = score?;
        Some(Self {
            progress_to_peak: score,
            remaining_upside: 100.0 - score,
            risk: if score < 50.0 {
                RiskLabel::Low
            } else {
                RiskLabel::Moderate
            },
        })
    }
}
