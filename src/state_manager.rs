use crate::models::MarketSnapshot;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tracing::debug;

/// Notifications for presentation consumers
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// Fired once per completed collection cycle, whatever its outcome
    DataUpdated { snapshot: MarketSnapshot },
}

/// Owner of the latest [`MarketSnapshot`].
///
/// Readers take cheap clones or subscribe; the only writer is the
/// collection cycle, which commits a whole snapshot at once.
pub struct MarketState {
    snapshot: watch::Sender<MarketSnapshot>,
    events: broadcast::Sender<MarketEvent>,
}

impl MarketState {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(MarketSnapshot::new());
        let (events, _) = broadcast::channel(64);
        Self { snapshot, events }
    }

    /// Copy of the latest committed snapshot
    pub fn current(&self) -> MarketSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe_snapshots(&self) -> watch::Receiver<MarketSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<MarketEvent> {
        self.events.subscribe()
    }

    /// Replace the snapshot and announce it
    pub(crate) fn commit(&self, snapshot: MarketSnapshot) {
        self.snapshot.send_replace(snapshot.clone());

        let receivers = self
            .events
            .send(MarketEvent::DataUpdated { snapshot })
            .unwrap_or(0);
        debug!("Snapshot committed, notified {} subscribers", receivers);
    }
}

impl Default for MarketState {
    fn default() -> Self {
        Self::new()
    }
}
