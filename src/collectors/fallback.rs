use crate::collectors::IndicatorResult;
use crate::error::CollectorError;
use std::future::Future;
use tracing::warn;

/// Run `primary`, and only if it fails, `fallback`.
///
/// When both fail the error carries both messages.
pub async fn with_fallback<T, P, F, FFut>(
    indicator: &'static str,
    primary: P,
    fallback: F,
) -> IndicatorResult<T>
where
    P: Future<Output = IndicatorResult<T>>,
    F: FnOnce() -> FFut,
    FFut: Future<Output = IndicatorResult<T>>,
{
    let primary_err = match primary.await {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    warn!("{} primary source failed ({}), trying fallback", indicator, primary_err);

    fallback().await.map_err(|fallback_err| CollectorError::Fallback {
        indicator,
        primary: primary_err.to_string(),
        fallback: fallback_err.to_string(),
    })
}
