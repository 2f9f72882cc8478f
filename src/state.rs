use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};

use crate::clock::Clock;
use crate::config::Config;
use crate::engine::assignment::AssignmentCoordinator;
use crate::events::forwarder::EventQueue;
use crate::models::event::LocationEvent;
use crate::observability::metrics::Metrics;
use crate::presence::PresenceRegistry;
use crate::proximity::ProximityIndex;
use crate::store::Store;

#[derive(Debug, Clone, Copy)]
pub struct OfferTtlPolicy {
    pub default_secs: u64,
    pub min_secs: u64,
    pub max_secs: u64,
}

impl OfferTtlPolicy {
    pub fn resolve(&self, requested_secs: Option<u64>) -> Option<Duration> {
        let secs = requested_secs.unwrap_or(self.default_secs);
        (self.min_secs..=self.max_secs)
            .contains(&secs)
            .then(|| Duration::from_secs(secs))
    }
}

pub struct AppState {
    pub presence: PresenceRegistry,
    pub proximity: ProximityIndex,
    pub coordinator: AssignmentCoordinator,
    pub offer_ttl: OfferTtlPolicy,
    pub location_events_tx: broadcast::Sender<LocationEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        config: &Config,
    ) -> (Self, mpsc::Receiver<LocationEvent>) {
        let metrics = Metrics::new();
        let (events, event_rx) = EventQueue::new(config.event_queue_size, metrics.clone());
        let (location_events_tx, _unused_rx) = broadcast::channel(config.event_buffer_size);

        (
            Self {
                presence: PresenceRegistry::new(
                    store.clone(),
                    clock.clone(),
                    config.presence_ttl(),
                    events,
                    metrics.clone(),
                ),
                proximity: ProximityIndex::new(store.clone(), metrics.clone()),
                coordinator: AssignmentCoordinator::new(store, clock, metrics.clone()),
                offer_ttl: OfferTtlPolicy {
                    default_secs: config.default_offer_ttl_secs,
                    min_secs: config.min_offer_ttl_secs,
                    max_secs: config.max_offer_ttl_secs,
                },
                location_events_tx,
                metrics,
            },
            event_rx,
        )
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::OfferTtlPolicy;

    #[test]
    fn offer_ttl_defaults_and_bounds() {
        let policy = OfferTtlPolicy {
            default_secs: 15,
            min_secs: 5,
            max_secs: 60,
        };

        assert_eq!(policy.resolve(None), Some(Duration::from_secs(15)));
        assert_eq!(policy.resolve(Some(5)), Some(Duration::from_secs(5)));
        assert_eq!(policy.resolve(Some(4)), None);
        assert_eq!(policy.resolve(Some(61)), None);
    }
}
