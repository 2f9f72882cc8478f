use std::sync::Arc;

use tracing::debug;

use crate::error::AppError;
use crate::geo::is_valid_coordinate;
use crate::models::presence::{GeoPoint, NearbyDriver};
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub const MAX_NEARBY_LIMIT: usize = 200;

pub struct ProximityIndex {
    store: Arc<dyn Store>,
    metrics: Metrics,
}

impl ProximityIndex {
    pub fn new(store: Arc<dyn Store>, metrics: Metrics) -> Self {
        Self { store, metrics }
    }

    pub async fn nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_m: f64,
        limit: usize,
    ) -> Result<Vec<NearbyDriver>, AppError> {
        if !is_valid_coordinate(lat, lng) {
            return Err(AppError::BadRequest("lat/lng out of range".to_string()));
        }
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(AppError::BadRequest("radius must be > 0".to_string()));
        }
        if limit == 0 || limit > MAX_NEARBY_LIMIT {
            return Err(AppError::BadRequest(format!(
                "limit must be in 1..={MAX_NEARBY_LIMIT}"
            )));
        }

        let hits = self
            .store
            .geo_radius(GeoPoint { lat, lng }, radius_m, limit)
            .await
            .inspect_err(|_| self.count_store_error())?;

        let mut drivers = Vec::with_capacity(hits.len());
        for hit in hits {
            let presence = self
                .store
                .presence(&hit.driver_id)
                .await
                .inspect_err(|_| self.count_store_error())?;

            match presence {
                Some(record) if record.is_online() => drivers.push(NearbyDriver {
                    driver_id: hit.driver_id,
                    distance: hit.distance_m,
                    lat: hit.point.lat,
                    lng: hit.point.lng,
                    last_seen_ms: record.last_seen_ms,
                }),
                _ => {
                    self.metrics.ghost_entries_filtered_total.inc();
                    debug!(driver_id = %hit.driver_id, "skipping proximity entry without live presence");
                }
            }
        }

        Ok(drivers)
    }

    fn count_store_error(&self) {
        self.metrics
            .store_errors_total
            .with_label_values(&["nearby"])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::ProximityIndex;
    use crate::clock::ManualClock;
    use crate::error::AppError;
    use crate::models::presence::{DriverStatus, GeoPoint, PresencePatch};
    use crate::observability::metrics::Metrics;
    use crate::store::{InMemoryStore, Store};

    const CENTER: GeoPoint = GeoPoint {
        lat: 10.7769,
        lng: 106.7009,
    };

    async fn place(store: &InMemoryStore, id: &str, lat: f64, status: Option<DriverStatus>, ttl_secs: u64) {
        let point = GeoPoint { lat, lng: CENTER.lng };
        store.geo_add(id, point).await.unwrap();
        let patch = PresencePatch {
            status,
            location: Some(point),
            last_seen_ms: 0,
            ..PresencePatch::default()
        };
        store
            .merge_presence(id, patch, Duration::from_secs(ttl_secs))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn only_online_leases_are_returned_nearest_first() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        place(&store, "far", 10.7800, Some(DriverStatus::Online), 60).await;
        place(&store, "near", 10.7770, Some(DriverStatus::Online), 60).await;
        place(&store, "never-online", 10.7771, None, 60).await;
        place(&store, "lapsing", 10.7772, Some(DriverStatus::Online), 5).await;

        clock.advance_ms(6_000);

        let metrics = Metrics::new();
        let index = ProximityIndex::new(store, metrics.clone());
        let drivers = index.nearby(CENTER.lat, CENTER.lng, 2_000.0, 10).await.unwrap();

        let ids: Vec<&str> = drivers.iter().map(|d| d.driver_id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert!(drivers[0].distance < drivers[1].distance);
        assert_eq!(metrics.ghost_entries_filtered_total.get(), 2);
    }

    #[tokio::test]
    async fn limit_is_a_cap_applied_before_filtering() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(InMemoryStore::new(clock));
        place(&store, "ghost", 10.7770, None, 60).await;
        place(&store, "live", 10.7780, Some(DriverStatus::Online), 60).await;

        let index = ProximityIndex::new(store, Metrics::new());
        let drivers = index.nearby(CENTER.lat, CENTER.lng, 2_000.0, 1).await.unwrap();

        assert!(drivers.is_empty());
    }

    #[tokio::test]
    async fn rejects_non_positive_radius() {
        let store = Arc::new(InMemoryStore::new(Arc::new(ManualClock::new(0))));
        let index = ProximityIndex::new(store, Metrics::new());

        let err = index.nearby(0.0, 0.0, 0.0, 10).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
