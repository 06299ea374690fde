use crate::models::{CspiAssessment, CspiBreakdown, CspiLevel, Indicator, MarketSnapshot};
use std::collections::BTreeMap;

/// Minimum number of indicators before a score is classified into a tier
pub const MIN_CLASSIFIED_INDICATORS: usize = 4;

/// Rounds half up to one decimal place
fn round1(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Map a raw indicator value onto its 0..100 sub-score.
///
/// MVRV is only capped from above, so a negative Z-score yields a negative
/// sub-score.
pub fn normalize(indicator: Indicator, value: f64) -> f64 {
    match indicator {
        Indicator::Mvrv => (value / 12.0 * 100.0).min(100.0),
        Indicator::FearGreed | Indicator::AltcoinSeason | Indicator::Rsi => value,
        Indicator::KimchiPremium => ((value + 20.0) / 40.0 * 100.0).clamp(0.0, 100.0),
        Indicator::BtcDominance => ((70.0 - value) / 35.0 * 100.0).clamp(0.0, 100.0),
    }
}

/// Base weights rescaled so the present indicators sum to 1.0
pub fn adjusted_weights(present: &[Indicator]) -> BTreeMap<Indicator, f64> {
    let total: f64 = present.iter().map(Indicator::base_weight).sum();
    if total == 0.0 {
        return BTreeMap::new();
    }

    present
        .iter()
        .map(|i| (*i, i.base_weight() / total))
        .collect()
}

/// Score whichever indicators are present in `snapshot`
pub fn calculate_cspi_score(snapshot: &MarketSnapshot) -> CspiBreakdown {
    let values: Vec<(Indicator, f64)> = Indicator::ALL
        .iter()
        .filter_map(|i| snapshot.indicator_value(*i).map(|v| (*i, v)))
        .collect();
    score_indicators(&values)
}

/// Weighted composite over a partial set of indicator values
pub fn score_indicators(values: &[(Indicator, f64)]) -> CspiBreakdown {
    let present: Vec<Indicator> = values.iter().map(|(i, _)| *i).collect();
    let total_weight: f64 = present.iter().map(Indicator::base_weight).sum();

    if values.is_empty() || total_weight == 0.0 {
        return CspiBreakdown::empty();
    }

    let weights = adjusted_weights(&present);
    let mut score = 0.0;
    let mut normalized_values = BTreeMap::new();
    let mut contributions = BTreeMap::new();

    for (indicator, value) in values {
        let normalized = normalize(*indicator, *value);
        let contribution = normalized * weights[indicator];

        score += contribution;
        normalized_values.insert(*indicator, round1(normalized));
        contributions.insert(*indicator, round1(contribution));
    }

    CspiBreakdown {
        total_score: Some(round1(score)),
        normalized_values,
        contributions,
        valid_data_count: values.len(),
        total_weight: round2(total_weight),
    }
}

/// Classify a breakdown into a risk tier and recommendation.
///
/// Tier boundaries are lower-inclusive: 25, 45, 65 and 80 belong to the
/// higher tier.
pub fn classify(breakdown: &CspiBreakdown) -> CspiAssessment {
    let count = breakdown.valid_data_count;

    let (level, recommendation) = match breakdown.total_score {
        None => (CspiLevel::NoData, "collecting data".to_string()),
        Some(_) if count < MIN_CLASSIFIED_INDICATORS => (
            CspiLevel::Partial,
            format!("partial data ({}/{})", count, Indicator::ALL.len()),
        ),
        Some(score) if score < 25.0 => (CspiLevel::Low, "aggressive buy".to_string()),
        Some(score) if score < 45.0 => (CspiLevel::MediumLow, "gradual buy".to_string()),
        Some(score) if score < 65.0 => (CspiLevel::Medium, "hold/watch".to_string()),
        Some(score) if score < 80.0 => (CspiLevel::MediumHigh, "partial sell".to_string()),
        Some(_) => (CspiLevel::High, "aggressive sell".to_string()),
    };

    CspiAssessment {
        level,
        recommendation,
    }
}
