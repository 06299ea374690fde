use serde::Serialize;

/// One staged sell trigger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellSignal {
    pub condition: &'static str,
    pub threshold: f64,
    pub active: bool,
    /// `threshold - mvrv`; negative once triggered, `None` without MVRV
    pub distance: Option<f64>,
}

/// The four independent sell stages
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SellSignals {
    pub stage_1: SellSignal,
    pub stage_2: SellSignal,
    pub stage_3: SellSignal,
    pub stage_4: SellSignal,
}

impl SellSignals {
    pub fn stages(&self) -> [&SellSignal; 4] {
        [&self.stage_1, &self.stage_2, &self.stage_3, &self.stage_4]
    }

    pub fn active_count(&self) -> usize {
        self.stages().iter().filter(|s| s.active).count()
    }
}
