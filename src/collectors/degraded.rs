use crate::collectors::{IndicatorCollector, IndicatorResult};
use crate::error::CollectorError;
use crate::models::Indicator;
use async_trait::async_trait;

/// Stand-in for an indicator whose source is gone; always fails so the
/// indicator stays null and is left out of the score
pub struct UnavailableCollector {
    indicator: Indicator,
}

impl UnavailableCollector {
    pub fn new(indicator: Indicator) -> Self {
        Self { indicator }
    }
}

#[async_trait]
impl IndicatorCollector for UnavailableCollector {
    type Output = f64;

    fn name(&self) -> &'static str {
        self.indicator.as_str()
    }

    async fn collect(&self) -> IndicatorResult<f64> {
        Err(CollectorError::Unavailable(self.indicator.as_str()))
    }
}
