use crate::error::{AppError, AppResult};
use crate::models::cspi::{CspiAssessment, CspiLevel, Indicator};
use crate::models::readings::{BtcMarketData, FearGreedReading};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest raw and derived market values.
///
/// Every numeric field is either a value inside its domain or `None`;
/// failed collections never write placeholder numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub timestamp: DateTime<Utc>,
    pub btc_price: Option<f64>,
    pub btc_price_previous: Option<f64>,
    pub btc_change_24h: Option<f64>,
    pub btc_market_cap: Option<f64>,
    pub btc_volume: Option<f64>,
    pub fear_greed_index: Option<u8>,
    pub fear_greed_classification: Option<String>,
    pub mvrv_z_score: Option<f64>,
    pub rsi_14d: Option<f64>,
    pub altcoin_season_index: Option<f64>,
    pub btc_dominance: Option<f64>,
    pub kimchi_premium: Option<f64>,
    pub cspi_score: Option<f64>,
    pub cspi_level: Option<CspiLevel>,
    pub cspi_recommendation: Option<String>,
}

impl MarketSnapshot {
    /// Create an empty snapshot with every value unset
    pub fn new() -> Self {
        Self {
            timestamp: Utc::now(),
            btc_price: None,
            btc_price_previous: None,
            btc_change_24h: None,
            btc_market_cap: None,
            btc_volume: None,
            fear_greed_index: None,
            fear_greed_classification: None,
            mvrv_z_score: None,
            rsi_14d: None,
            altcoin_season_index: None,
            btc_dominance: None,
            kimchi_premium: None,
            cspi_score: None,
            cspi_level: None,
            cspi_recommendation: None,
        }
    }

    /// Fold in a successful price collection.
    ///
    /// Market cap and volume keep their last known value when the new
    /// reading is missing or zero.
    pub fn apply_price(&mut self, data: &BtcMarketData) {
        self.btc_price_previous = self.btc_price;
        self.btc_price = Some(data.price);

        if let Some(change) = data.change_24h {
            self.btc_change_24h = Some(change);
        }
        if let Some(cap) = data.market_cap.filter(|v| *v != 0.0) {
            self.btc_market_cap = Some(cap);
        }
        if let Some(volume) = data.volume.filter(|v| *v != 0.0) {
            self.btc_volume = Some(volume);
        }
    }

    pub fn apply_fear_greed(&mut self, reading: &FearGreedReading) {
        self.fear_greed_index = Some(reading.value);
        self.fear_greed_classification = Some(reading.classification.clone());
    }

    /// Current value of a scored indicator
    pub fn indicator_value(&self, indicator: Indicator) -> Option<f64> {
        match indicator {
            Indicator::Mvrv => self.mvrv_z_score,
            Indicator::AltcoinSeason => self.altcoin_season_index,
            Indicator::KimchiPremium => self.kimchi_premium,
            Indicator::BtcDominance => self.btc_dominance,
            Indicator::FearGreed => self.fear_greed_index.map(f64::from),
            Indicator::Rsi => self.rsi_14d,
        }
    }

    /// Mutable slot of a plain numeric indicator. Fear & Greed carries a
    /// label and is written through [`MarketSnapshot::apply_fear_greed`].
    pub fn scalar_mut(&mut self, indicator: Indicator) -> Option<&mut Option<f64>> {
        match indicator {
            Indicator::Mvrv => Some(&mut self.mvrv_z_score),
            Indicator::AltcoinSeason => Some(&mut self.altcoin_season_index),
            Indicator::KimchiPremium => Some(&mut self.kimchi_premium),
            Indicator::BtcDominance => Some(&mut self.btc_dominance),
            Indicator::Rsi => Some(&mut self.rsi_14d),
            Indicator::FearGreed => None,
        }
    }

    pub fn apply_assessment(&mut self, score: Option<f64>, assessment: CspiAssessment) {
        self.cspi_score = score;
        self.cspi_level = Some(assessment.level);
        self.cspi_recommendation = Some(assessment.recommendation);
    }

    /// Number of scored indicators currently holding a value
    pub fn connected_indicators(&self) -> usize {
        Indicator::ALL
            .iter()
            .filter(|i| self.indicator_value(**i).is_some())
            .count()
    }

    pub fn touch(&mut self) {
        self.timestamp = Utc::now();
    }

    /// Check every populated field against its domain
    pub fn validate(&self) -> AppResult<()> {
        fn check(name: &str, value: Option<f64>, min: f64, max: f64) -> AppResult<()> {
            match value {
                Some(v) if !v.is_finite() || v < min || v > max => Err(AppError::Validation(
                    format!("{} = {} outside [{}, {}]", name, v, min, max),
                )),
                _ => Ok(()),
            }
        }

        check("btcPrice", self.btc_price, 0.0, f64::MAX)?;
        check("btcPricePrevious", self.btc_price_previous, 0.0, f64::MAX)?;
        check("btcChange24h", self.btc_change_24h, -100.0, f64::MAX)?;
        check("btcMarketCap", self.btc_market_cap, 0.0, f64::MAX)?;
        check("btcVolume", self.btc_volume, 0.0, f64::MAX)?;
        check("fearGreedIndex", self.fear_greed_index.map(f64::from), 0.0, 100.0)?;
        check("mvrvZScore", self.mvrv_z_score, f64::MIN, f64::MAX)?;
        check("rsi14d", self.rsi_14d, 0.0, 100.0)?;
        check("altcoinSeasonIndex", self.altcoin_season_index, 0.0, 100.0)?;
        check("btcDominance", self.btc_dominance, 0.0, 100.0)?;
        check("kimchiPremium", self.kimchi_premium, f64::MIN, f64::MAX)?;
        check("cspiScore", self.cspi_score, f64::MIN, 100.0)?;
        Ok(())
    }
}

impl Default for MarketSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market(price: f64, cap: Option<f64>) -> BtcMarketData {
        BtcMarketData {
            price,
            change_24h: Some(1.2),
            market_cap: cap,
            volume: Some(0.0),
        }
    }

    #[test]
    fn test_new_snapshot_is_empty() {
        let snapshot = MarketSnapshot::new();
        assert!(snapshot.btc_price.is_none());
        assert!(snapshot.cspi_score.is_none());
        assert!(snapshot.cspi_level.is_none());
        assert_eq!(snapshot.connected_indicators(), 0);
    }

    #[test]
    fn test_apply_price_rolls_previous() {
        let mut snapshot = MarketSnapshot::new();
        snapshot.apply_price(&market(64000.0, Some(1.2e12)));
        snapshot.apply_price(&market(65000.0, Some(0.0)));

        assert_eq!(snapshot.btc_price, Some(65000.0));
        assert_eq!(snapshot.btc_price_previous, Some(64000.0));
        // zero cap keeps last known value
        assert_eq!(snapshot.btc_market_cap, Some(1.2e12));
        assert_eq!(snapshot.btc_volume, None);
    }

    #[test]
    fn test_price_only_reading_keeps_other_fields() {
        let mut snapshot = MarketSnapshot::new();
        snapshot.apply_price(&market(64000.0, Some(1.2e12)));
        snapshot.apply_price(&BtcMarketData::price_only(64500.0));

        assert_eq!(snapshot.btc_change_24h, Some(1.2));
        assert_eq!(snapshot.btc_market_cap, Some(1.2e12));
    }

    #[test]
    fn test_scalar_slots() {
        let mut snapshot = MarketSnapshot::new();
        if let Some(slot) = snapshot.scalar_mut(Indicator::KimchiPremium) {
            *slot = Some(2.5);
        }
        assert_eq!(snapshot.kimchi_premium, Some(2.5));
        assert_eq!(snapshot.indicator_value(Indicator::KimchiPremium), Some(2.5));

        // fear & greed only changes through apply_fear_greed
        assert!(snapshot.scalar_mut(Indicator::FearGreed).is_none());
        assert_eq!(snapshot.fear_greed_index, None);
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut snapshot = MarketSnapshot::new();
        snapshot.kimchi_premium = Some(f64::NAN);
        assert!(snapshot.validate().is_err());

        snapshot.kimchi_premium = Some(2.0);
        snapshot.rsi_14d = Some(120.0);
        assert!(snapshot.validate().is_err());

        snapshot.rsi_14d = None;
        assert!(snapshot.validate().is_ok());
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(MarketSnapshot::new()).unwrap();
        assert!(json.get("btcPrice").is_some());
        assert!(json["fearGreedIndex"].is_null());
    }
}
