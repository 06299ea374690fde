use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The six scored indicators, in weight order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    Mvrv,
    AltcoinSeason,
    KimchiPremium,
    BtcDominance,
    FearGreed,
    Rsi,
}

impl Indicator {
    pub const ALL: [Indicator; 6] = [
        Indicator::Mvrv,
        Indicator::AltcoinSeason,
        Indicator::KimchiPremium,
        Indicator::BtcDominance,
        Indicator::FearGreed,
        Indicator::Rsi,
    ];

    /// Fixed base weight; all six sum to 1.0
    pub fn base_weight(&self) -> f64 {
        match self {
            Indicator::Mvrv => 0.30,
            Indicator::AltcoinSeason => 0.25,
            Indicator::KimchiPremium => 0.20,
            Indicator::BtcDominance => 0.15,
            Indicator::FearGreed => 0.05,
            Indicator::Rsi => 0.05,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Indicator::Mvrv => "mvrv",
            Indicator::AltcoinSeason => "altcoin_season",
            Indicator::KimchiPremium => "kimchi_premium",
            Indicator::BtcDominance => "btc_dominance",
            Indicator::FearGreed => "fear_greed",
            Indicator::Rsi => "rsi",
        }
    }

    /// Accepts canonical names plus the short aliases used by the dashboard
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "mvrv" | "mvrv_z_score" => Ok(Indicator::Mvrv),
            "altcoin_season" | "altseason" => Ok(Indicator::AltcoinSeason),
            "kimchi_premium" | "kimchi" => Ok(Indicator::KimchiPremium),
            "btc_dominance" | "btc_dom" | "dominance" => Ok(Indicator::BtcDominance),
            "fear_greed" | "fear_greed_index" => Ok(Indicator::FearGreed),
            "rsi" | "rsi_14d" => Ok(Indicator::Rsi),
            _ => Err(format!("Unknown indicator: {}", s)),
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discrete risk tier of the composite score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CspiLevel {
    #[serde(rename = "NO_DATA")]
    NoData,
    #[serde(rename = "PARTIAL")]
    Partial,
    #[serde(rename = "LOW")]
    Low,
    #[serde(rename = "MEDIUM-LOW")]
    MediumLow,
    #[serde(rename = "MEDIUM")]
    Medium,
    #[serde(rename = "MEDIUM-HIGH")]
    MediumHigh,
    #[serde(rename = "HIGH")]
    High,
}

impl CspiLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CspiLevel::NoData => "NO_DATA",
            CspiLevel::Partial => "PARTIAL",
            CspiLevel::Low => "LOW",
            CspiLevel::MediumLow => "MEDIUM-LOW",
            CspiLevel::Medium => "MEDIUM",
            CspiLevel::MediumHigh => "MEDIUM-HIGH",
            CspiLevel::High => "HIGH",
        }
    }

    /// Whether the level came from a full score rather than missing data
    pub fn is_scored(&self) -> bool {
        !matches!(self, CspiLevel::NoData | CspiLevel::Partial)
    }
}

impl fmt::Display for CspiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-cycle result of the aggregation engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CspiBreakdown {
    pub total_score: Option<f64>,
    /// Indicator -> 0..100 sub-score, rounded to 1 decimal
    pub normalized_values: BTreeMap<Indicator, f64>,
    /// Indicator -> weighted points, rounded to 1 decimal
    pub contributions: BTreeMap<Indicator, f64>,
    pub valid_data_count: usize,
    /// Sum of the base weights actually used
    pub total_weight: f64,
}

impl CspiBreakdown {
    pub fn empty() -> Self {
        Self {
            total_score: None,
            normalized_values: BTreeMap::new(),
            contributions: BTreeMap::new(),
            valid_data_count: 0,
            total_weight: 0.0,
        }
    }
}

/// Level plus the recommendation shown next to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CspiAssessment {
    pub level: CspiLevel,
    pub recommendation: String,
}
