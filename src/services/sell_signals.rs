use crate::models::{MarketSnapshot, SellSignal, SellSignals};

fn stage(condition: &'static str, threshold: f64, mvrv: Option<f64>, extra: bool) -> SellSignal {
    SellSignal {
        condition,
        threshold,
        active: extra && mvrv.is_some_and(|m| m >= threshold),
        distance: mvrv.map(|m| threshold - m),
    }
}

/// Evaluate the staged sell triggers from scratch.
///
/// A missing MVRV or Fear & Greed value leaves the dependent stages
/// inactive.
pub fn evaluate_sell_signals(mvrv: Option<f64>, fear_greed: Option<u8>) -> SellSignals {
    let greed = fear_greed.is_some_and(|fg| fg >= 85);

    SellSignals {
        stage_1: stage("MVRV >= 5.0", 5.0, mvrv, true),
        stage_2: stage("MVRV >= 6.0 + F&G >= 85", 6.0, mvrv, greed),
        stage_3: stage("MVRV >= 7.5", 7.5, mvrv, true),
        stage_4: stage("MVRV >= 9.0", 9.0, mvrv, true),
    }
}

pub fn sell_signals_for(snapshot: &MarketSnapshot) -> SellSignals {
    evaluate_sell_signals(snapshot.mvrv_z_score, snapshot.fear_greed_index)
}
