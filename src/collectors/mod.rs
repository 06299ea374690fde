//! Indicator collectors.
//!
//! Each collector fetches, parses and validates one external indicator and
//! always hands back a definite outcome: a value or a [`CollectorError`].

pub mod degraded;
pub mod fallback;
pub mod fear_greed;
pub mod kimchi;
pub mod mvrv;
pub mod price;

use crate::error::CollectorError;
use async_trait::async_trait;

pub use degraded::UnavailableCollector;
pub use fallback::with_fallback;
pub use fear_greed::FearGreedCollector;
pub use kimchi::{extract_kimchi_premium, KimchiCollector};
pub use mvrv::{extract_mvrv, MvrvCollector};
pub use price::PriceCollector;

/// Per-collector outcome, folded into the snapshot and then discarded
pub type IndicatorResult<T> = Result<T, CollectorError>;

/// One independently failing indicator source
#[async_trait]
pub trait IndicatorCollector: Send + Sync {
    type Output: Send + 'static;

    /// Logical name used in logs and error messages
    fn name(&self) -> &'static str;

    async fn collect(&self) -> IndicatorResult<Self::Output>;
}

/// Type-erased collectors for the scalar indicators
pub type ScalarCollector = Box<dyn IndicatorCollector<Output = f64>>;

/// Reject values outside `[min, max]` (or non-finite ones)
pub(crate) fn ensure_range(
    indicator: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, crate::error::ExtractError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(value)
    } else {
        Err(crate::error::ExtractError::OutOfDomain {
            indicator,
            value,
            min,
            max,
        })
    }
}
