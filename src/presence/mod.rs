use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::clock::Clock;
use crate::error::AppError;
use crate::events::forwarder::EventQueue;
use crate::geo::is_valid_coordinate;
use crate::models::event::LocationEvent;
use crate::models::presence::{DriverStatus, GeoPoint, PresencePatch, PresenceRecord, Telemetry};
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub struct PresenceRegistry {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    lease: Duration,
    events: EventQueue,
    metrics: Metrics,
}

impl PresenceRegistry {
    pub fn new(
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
        lease: Duration,
        events: EventQueue,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            clock,
            lease,
            events,
            metrics,
        }
    }

    pub fn lease(&self) -> Duration {
        self.lease
    }

    pub async fn set_status(&self, driver_id: &str, online: bool) -> Result<(), AppError> {
        if online {
            let patch = PresencePatch {
                status: Some(DriverStatus::Online),
                last_seen_ms: self.clock.now_ms(),
                ..PresencePatch::default()
            };
            self.store
                .merge_presence(driver_id, patch, self.lease)
                .await
                .inspect_err(|_| self.count_store_error("set_status"))?;
            info!(driver_id, "driver online");
        } else {
            self.store
                .remove_presence(driver_id)
                .await
                .inspect_err(|_| self.count_store_error("set_status"))?;
            self.store
                .geo_remove(driver_id)
                .await
                .inspect_err(|_| self.count_store_error("set_status"))?;
            info!(driver_id, "driver offline");
        }

        Ok(())
    }

    pub async fn upsert_location(
        &self,
        driver_id: &str,
        lat: f64,
        lng: f64,
        telemetry: Telemetry,
    ) -> Result<(), AppError> {
        validate_report(lat, lng, &telemetry)?;

        let point = GeoPoint { lat, lng };
        let now_ms = self.clock.now_ms();

        self.store
            .geo_add(driver_id, point)
            .await
            .inspect_err(|_| self.count_store_error("upsert_location"))?;

        let patch = PresencePatch {
            status: None,
            location: Some(point),
            speed: telemetry.speed,
            heading: telemetry.heading,
            last_seen_ms: now_ms,
        };
        self.store
            .merge_presence(driver_id, patch, self.lease)
            .await
            .inspect_err(|_| self.count_store_error("upsert_location"))?;

        self.metrics.location_updates_total.inc();
        debug!(driver_id, lat, lng, "location ingested");

        self.events.enqueue(LocationEvent::driver_location(
            driver_id,
            lat,
            lng,
            telemetry.speed,
            telemetry.heading,
            telemetry.ts.unwrap_or(now_ms),
        ));

        Ok(())
    }

    pub async fn presence(&self, driver_id: &str) -> Result<Option<PresenceRecord>, AppError> {
        let record = self
            .store
            .presence(driver_id)
            .await
            .inspect_err(|_| self.count_store_error("presence"))?;
        Ok(record)
    }

    fn count_store_error(&self, operation: &str) {
        self.metrics
            .store_errors_total
            .with_label_values(&[operation])
            .inc();
    }
}

fn validate_report(lat: f64, lng: f64, telemetry: &Telemetry) -> Result<(), AppError> {
    if !is_valid_coordinate(lat, lng) {
        return Err(AppError::BadRequest("lat/lng out of range".to_string()));
    }

    if let Some(speed) = telemetry.speed {
        if !speed.is_finite() || speed < 0.0 {
            return Err(AppError::BadRequest("speed must be >= 0".to_string()));
        }
    }

    if let Some(heading) = telemetry.heading {
        if !(0.0..360.0).contains(&heading) {
            return Err(AppError::BadRequest("heading must be in [0, 360)".to_string()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::PresenceRegistry;
    use crate::clock::ManualClock;
    use crate::error::AppError;
    use crate::events::forwarder::EventQueue;
    use crate::models::event::LocationEvent;
    use crate::models::presence::{DriverStatus, GeoPoint, Telemetry};
    use crate::observability::metrics::Metrics;
    use crate::store::{InMemoryStore, Store};

    fn registry() -> (Arc<InMemoryStore>, PresenceRegistry, mpsc::Receiver<LocationEvent>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let metrics = Metrics::new();
        let (events, rx) = EventQueue::new(16, metrics.clone());
        let registry = PresenceRegistry::new(
            store.clone(),
            clock,
            Duration::from_secs(60),
            events,
            metrics,
        );
        (store, registry, rx)
    }

    #[tokio::test]
    async fn location_only_driver_has_no_status() {
        let (_store, registry, _rx) = registry();

        registry
            .upsert_location("d6", 10.0, 106.0, Telemetry::default())
            .await
            .unwrap();

        let record = registry.presence("d6").await.unwrap().unwrap();
        assert_eq!(record.status, None);
        assert_eq!(record.last_seen_ms, 1_000);
    }

    #[tokio::test]
    async fn location_keeps_online_status_and_publishes() {
        let (_store, registry, mut rx) = registry();
        registry.set_status("d1", true).await.unwrap();

        let telemetry = Telemetry {
            speed: Some(12.0),
            heading: Some(90.0),
            ts: Some(42),
        };
        registry
            .upsert_location("d1", 10.0, 106.0, telemetry)
            .await
            .unwrap();

        let record = registry.presence("d1").await.unwrap().unwrap();
        assert_eq!(record.status, Some(DriverStatus::Online));
        assert_eq!(record.speed, Some(12.0));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.driver_id, "d1");
        assert_eq!(event.ts, 42);
        assert_eq!(event.heading, Some(90.0));
    }

    #[tokio::test]
    async fn going_offline_clears_presence_and_proximity() {
        let (store, registry, _rx) = registry();
        registry.set_status("d1", true).await.unwrap();
        registry
            .upsert_location("d1", 10.0, 106.0, Telemetry::default())
            .await
            .unwrap();

        registry.set_status("d1", false).await.unwrap();

        assert!(registry.presence("d1").await.unwrap().is_none());
        let hits = store
            .geo_radius(GeoPoint { lat: 10.0, lng: 106.0 }, 100.0, 10)
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn invalid_report_is_rejected_before_any_write() {
        let (store, registry, mut rx) = registry();

        let err = registry
            .upsert_location("d1", 91.0, 0.0, Telemetry::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(store.presence("d1").await.unwrap().is_none());
        assert!(rx.try_recv().is_err());
    }
}
