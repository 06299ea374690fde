use crate::cache::ResponseCache;
use crate::collectors::{
    FearGreedCollector, IndicatorCollector, IndicatorResult, KimchiCollector, MvrvCollector,
    PriceCollector, ScalarCollector, UnavailableCollector,
};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::fetch::{FetchRacer, HttpTransport};
use crate::models::{
    BtcMarketData, CspiBreakdown, CspiOutlook, DataValidation, FearGreedReading, Indicator,
    MarketSnapshot, SellSignals,
};
use crate::services::cspi_calculator::{calculate_cspi_score, classify};
use crate::services::sell_signals::sell_signals_for;
use crate::state_manager::MarketState;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

/// One collector per indicator slot
pub struct Collectors {
    pub price: Box<dyn IndicatorCollector<Output = BtcMarketData>>,
    pub fear_greed: Box<dyn IndicatorCollector<Output = FearGreedReading>>,
    pub mvrv: ScalarCollector,
    pub kimchi: ScalarCollector,
    pub rsi: ScalarCollector,
    pub altcoin_season: ScalarCollector,
    pub btc_dominance: ScalarCollector,
}

impl Collectors {
    /// Production wiring: HTTP collectors sharing one transport, racer and cache
    pub fn from_config(config: &AppConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let cache = Arc::new(ResponseCache::from_config(&config.cache));
        let racer = Arc::new(FetchRacer::from_config(transport.clone(), cache, &config.fetch));

        Self {
            price: Box::new(PriceCollector::from_config(
                transport.clone(),
                &config.sources,
                &config.fetch,
            )),
            fear_greed: Box::new(FearGreedCollector::from_config(
                transport.clone(),
                &config.sources,
                &config.fetch,
            )),
            mvrv: Box::new(MvrvCollector::from_config(
                transport,
                racer.clone(),
                &config.sources,
                &config.fetch,
            )),
            kimchi: Box::new(KimchiCollector::from_config(racer, &config.sources, &config.fetch)),
            rsi: Box::new(UnavailableCollector::new(Indicator::Rsi)),
            altcoin_season: Box::new(UnavailableCollector::new(Indicator::AltcoinSeason)),
            btc_dominance: Box::new(UnavailableCollector::new(Indicator::BtcDominance)),
        }
    }

    /// Scalar collector for an indicator; Fear & Greed has its own slot
    pub fn scalar(&self, indicator: Indicator) -> Option<&ScalarCollector> {
        match indicator {
            Indicator::Mvrv => Some(&self.mvrv),
            Indicator::KimchiPremium => Some(&self.kimchi),
            Indicator::Rsi => Some(&self.rsi),
            Indicator::AltcoinSeason => Some(&self.altcoin_season),
            Indicator::BtcDominance => Some(&self.btc_dominance),
            Indicator::FearGreed => None,
        }
    }
}

/// Result of one `collect_all` call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionReport {
    pub success: bool,
    pub snapshot: MarketSnapshot,
    pub breakdown: Option<CspiBreakdown>,
    pub sell_signals: Option<SellSignals>,
    pub validation: DataValidation,
    pub outlook: Option<CspiOutlook>,
    pub error: Option<String>,
}

struct CycleOutput {
    snapshot: MarketSnapshot,
    breakdown: CspiBreakdown,
    sell_signals: SellSignals,
}

/// Clears the in-flight flag even if the cycle future is dropped
struct RefreshGuard<'a>(&'a AtomicBool);

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

async fn collect_logged<T: Send + 'static>(
    collector: &dyn IndicatorCollector<Output = T>,
) -> IndicatorResult<T> {
    let result = collector.collect().await;
    if let Err(e) = &result {
        warn!("{} collection failed: {}", collector.name(), e);
    }
    result
}

/// Runs collection cycles and exposes the engine to presentation
pub struct MarketDataService {
    collectors: Collectors,
    state: Arc<MarketState>,
    refreshing: AtomicBool,
}

impl MarketDataService {
    pub fn new(collectors: Collectors, state: Arc<MarketState>) -> Self {
        Self {
            collectors,
            state,
            refreshing: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> &Arc<MarketState> {
        &self.state
    }

    /// Latest committed snapshot
    pub fn get_current(&self) -> MarketSnapshot {
        self.state.current()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Run one full collection cycle.
    ///
    /// Returns `AppError::RefreshInProgress` without side effects if a cycle
    /// is already running. Otherwise the snapshot is committed and a
    /// `DataUpdated` event fired, whether the cycle succeeded or not.
    pub async fn collect_all(&self) -> AppResult<CollectionReport> {
        if self
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Refresh requested while a cycle is in flight, ignoring");
            return Err(AppError::RefreshInProgress);
        }
        let _guard = RefreshGuard(&self.refreshing);

        info!("Starting collection cycle");

        let report = match self.run_cycle().await {
            Ok(output) => {
                self.state.commit(output.snapshot.clone());
                log_summary(&output);

                CollectionReport {
                    success: true,
                    validation: DataValidation::from_snapshot(&output.snapshot),
                    outlook: CspiOutlook::from_score(output.snapshot.cspi_score),
                    snapshot: output.snapshot,
                    breakdown: Some(output.breakdown),
                    sell_signals: Some(output.sell_signals),
                    error: None,
                }
            }
            Err(e) => {
                error!("Collection cycle failed: {}", e);

                let mut snapshot = self.state.current();
                snapshot.touch();
                self.state.commit(snapshot.clone());

                CollectionReport {
                    success: false,
                    validation: DataValidation::from_snapshot(&snapshot),
                    outlook: CspiOutlook::from_score(snapshot.cspi_score),
                    snapshot,
                    breakdown: None,
                    sell_signals: None,
                    error: Some(e.to_string()),
                }
            }
        };

        Ok(report)
    }

    async fn run_cycle(&self) -> AppResult<CycleOutput> {
        let c = &self.collectors;
        let (price, fear_greed, mvrv, kimchi, rsi, altcoin_season, btc_dominance) = tokio::join!(
            collect_logged(c.price.as_ref()),
            collect_logged(c.fear_greed.as_ref()),
            collect_logged(c.mvrv.as_ref()),
            collect_logged(c.kimchi.as_ref()),
            collect_logged(c.rsi.as_ref()),
            collect_logged(c.altcoin_season.as_ref()),
            collect_logged(c.btc_dominance.as_ref()),
        );

        // Work on a draft; nothing is visible until the commit
        let mut draft = self.state.current();

        if let Ok(data) = &price {
            draft.apply_price(data);
        }
        if let Ok(reading) = &fear_greed {
            draft.apply_fear_greed(reading);
        }

        for (indicator, result) in [
            (Indicator::Mvrv, mvrv),
            (Indicator::KimchiPremium, kimchi),
            (Indicator::Rsi, rsi),
            (Indicator::AltcoinSeason, altcoin_season),
            (Indicator::BtcDominance, btc_dominance),
        ] {
            if let (Ok(value), Some(slot)) = (result, draft.scalar_mut(indicator)) {
                *slot = Some(value);
            }
        }

        draft.validate()?;

        let breakdown = calculate_cspi_score(&draft);
        let assessment = classify(&breakdown);
        draft.apply_assessment(breakdown.total_score, assessment);
        draft.touch();

        let sell_signals = sell_signals_for(&draft);

        Ok(CycleOutput {
            snapshot: draft,
            breakdown,
            sell_signals,
        })
    }

    /// Debug check: run a single named collector and return its value.
    ///
    /// Never touches the snapshot; failures and unknown names yield `None`.
    pub async fn test_indicator(&self, name: &str) -> Option<f64> {
        let key = name.trim().to_lowercase();

        let result = match key.as_str() {
            "price" | "btc_price" => collect_logged(self.collectors.price.as_ref())
                .await
                .map(|d| d.price),
            _ => match Indicator::from_str(&key) {
                Ok(Indicator::FearGreed) => collect_logged(self.collectors.fear_greed.as_ref())
                    .await
                    .map(|r| f64::from(r.value)),
                Ok(indicator) => match self.collectors.scalar(indicator) {
                    Some(collector) => collect_logged(collector.as_ref()).await,
                    None => return None,
                },
                Err(e) => {
                    warn!("{}", e);
                    return None;
                }
            },
        };

        match result {
            Ok(value) => {
                info!("Indicator test {} succeeded: {}", key, value);
                Some(value)
            }
            Err(_) => None,
        }
    }
}

fn log_summary(output: &CycleOutput) {
    let snapshot = &output.snapshot;
    match snapshot.cspi_score {
        Some(score) => info!(
            "Collection cycle complete: CSPI {}/100 ({}/6 indicators), level {}, {}",
            score,
            output.breakdown.valid_data_count,
            snapshot.cspi_level.map(|l| l.as_str()).unwrap_or("-"),
            snapshot.cspi_recommendation.as_deref().unwrap_or("-"),
        ),
        None => warn!("Collection cycle complete: no indicator data, CSPI unavailable"),
    }
}
