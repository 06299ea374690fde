#![allow(dead_code)]

use async_trait::async_trait;
use cspi_backend::collectors::{
    IndicatorCollector, IndicatorResult, ScalarCollector, UnavailableCollector,
};
use cspi_backend::error::CollectorError;
use cspi_backend::models::*;
use cspi_backend::{Collectors, MarketDataService, MarketState};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Collector that always returns the same value
pub struct FixedCollector<T> {
    name: &'static str,
    value: T,
    delay: Option<Duration>,
}

impl<T> FixedCollector<T> {
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            value,
            delay: None,
        }
    }

    /// Sleep before answering, to keep a cycle in flight
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> IndicatorCollector for FixedCollector<T> {
    type Output = T;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn collect(&self) -> IndicatorResult<T> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.value.clone())
    }
}

/// Collector that replays scripted outcomes, then fails forever
pub struct ScriptedCollector<T> {
    name: &'static str,
    outcomes: Mutex<VecDeque<IndicatorResult<T>>>,
}

impl<T> ScriptedCollector<T> {
    pub fn new(name: &'static str, outcomes: Vec<IndicatorResult<T>>) -> Self {
        Self {
            name,
            outcomes: Mutex::new(outcomes.into()),
        }
    }
}

#[async_trait]
impl<T: Send + 'static> IndicatorCollector for ScriptedCollector<T> {
    type Output = T;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn collect(&self) -> IndicatorResult<T> {
        let next = self.outcomes.lock().pop_front();
        next.unwrap_or(Err(CollectorError::Unavailable(self.name)))
    }
}

/// Collector that always fails with a service error
pub struct FailingCollector<T> {
    name: &'static str,
    _output: PhantomData<fn() -> T>,
}

impl<T> FailingCollector<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            _output: PhantomData,
        }
    }
}

#[async_trait]
impl<T: Send + 'static> IndicatorCollector for FailingCollector<T> {
    type Output = T;

    fn name(&self) -> &'static str {
        self.name
    }

    async fn collect(&self) -> IndicatorResult<T> {
        Err(CollectorError::Service(format!("{} is down", self.name)))
    }
}

pub fn failing<T: Send + 'static>(name: &'static str) -> Box<dyn IndicatorCollector<Output = T>> {
    Box::new(FailingCollector::<T>::new(name))
}

pub fn fixed_scalar(name: &'static str, value: f64) -> ScalarCollector {
    Box::new(FixedCollector::new(name, value))
}

pub fn unavailable(indicator: Indicator) -> ScalarCollector {
    Box::new(UnavailableCollector::new(indicator))
}

pub fn market_data(price: f64) -> BtcMarketData {
    BtcMarketData {
        price,
        change_24h: Some(2.5),
        market_cap: Some(1.28e12),
        volume: Some(3.1e10),
    }
}

pub fn greed(value: u8) -> FearGreedReading {
    FearGreedReading {
        value,
        classification: "Neutral".to_string(),
    }
}

/// price=65000, fearGreed=50, mvrv=8, kimchi=2; rsi, altcoin season and
/// dominance have no source
pub fn scenario_collectors() -> Collectors {
    Collectors {
        price: Box::new(FixedCollector::new("price", market_data(65000.0))),
        fear_greed: Box::new(FixedCollector::new("fear_greed", greed(50))),
        mvrv: fixed_scalar("mvrv", 8.0),
        kimchi: fixed_scalar("kimchi_premium", 2.0),
        rsi: unavailable(Indicator::Rsi),
        altcoin_season: unavailable(Indicator::AltcoinSeason),
        btc_dominance: unavailable(Indicator::BtcDominance),
    }
}

/// Every source down
pub fn failing_collectors() -> Collectors {
    Collectors {
        price: failing("price"),
        fear_greed: failing("fear_greed"),
        mvrv: failing("mvrv"),
        kimchi: failing("kimchi_premium"),
        rsi: unavailable(Indicator::Rsi),
        altcoin_season: unavailable(Indicator::AltcoinSeason),
        btc_dominance: unavailable(Indicator::BtcDominance),
    }
}

/// Every indicator reporting
pub fn full_collectors(mvrv: f64, fear_greed: u8) -> Collectors {
    Collectors {
        price: Box::new(FixedCollector::new("price", market_data(98000.0))),
        fear_greed: Box::new(FixedCollector::new("fear_greed", greed(fear_greed))),
        mvrv: fixed_scalar("mvrv", mvrv),
        kimchi: fixed_scalar("kimchi_premium", 4.0),
        rsi: fixed_scalar("rsi", 72.0),
        altcoin_season: fixed_scalar("altcoin_season", 40.0),
        btc_dominance: fixed_scalar("btc_dominance", 52.5),
    }
}

pub fn test_service(collectors: Collectors) -> Arc<MarketDataService> {
    Arc::new(MarketDataService::new(collectors, Arc::new(MarketState::new())))
}
