use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::clock::Clock;
use crate::geo::haversine_m;
use crate::models::assignment::{apply_claim, AssignmentRecord, ClaimOutcome};
use crate::models::presence::{GeoPoint, PresencePatch, PresenceRecord};
use crate::store::{ttl_ms, GeoMatch, Store, StoreResult};

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at_ms: i64,
}

impl<T> Expiring<T> {
    fn new(value: T, expires_at_ms: i64) -> Self {
        Self {
            value,
            expires_at_ms,
        }
    }

    fn is_live(&self, now_ms: i64) -> bool {
        now_ms <= self.expires_at_ms
    }
}

pub struct InMemoryStore {
    clock: Arc<dyn Clock>,
    presence: DashMap<String, Expiring<PresenceRecord>>,
    geo: DashMap<String, GeoPoint>,
    assignments: DashMap<String, Expiring<AssignmentRecord>>,
}

impl InMemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            presence: DashMap::new(),
            geo: DashMap::new(),
            assignments: DashMap::new(),
        }
    }

    fn expiry_from_now(&self, ttl: Duration) -> i64 {
        self.clock.now_ms().saturating_add(ttl_ms(ttl))
    }

    fn live_presence(&self, driver_id: &str, now_ms: i64) -> Option<PresenceRecord> {
        self.presence
            .get(driver_id)
            .filter(|entry| entry.is_live(now_ms))
            .map(|entry| entry.value.clone())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn merge_presence(
        &self,
        driver_id: &str,
        patch: PresencePatch,
        ttl: Duration,
    ) -> StoreResult<()> {
        let now_ms = self.clock.now_ms();
        let expires_at_ms = self.expiry_from_now(ttl);

        let mut entry = self
            .presence
            .entry(driver_id.to_string())
            .or_insert_with(|| Expiring::new(PresenceRecord::default(), expires_at_ms));

        if !entry.is_live(now_ms) {
            entry.value = PresenceRecord::default();
        }
        patch.apply(&mut entry.value);
        entry.expires_at_ms = expires_at_ms;

        Ok(())
    }

    async fn presence(&self, driver_id: &str) -> StoreResult<Option<PresenceRecord>> {
        Ok(self.live_presence(driver_id, self.clock.now_ms()))
    }

    async fn remove_presence(&self, driver_id: &str) -> StoreResult<()> {
        self.presence.remove(driver_id);
        Ok(())
    }

    async fn geo_add(&self, driver_id: &str, point: GeoPoint) -> StoreResult<()> {
        self.geo.insert(driver_id.to_string(), point);
        Ok(())
    }

    async fn geo_remove(&self, driver_id: &str) -> StoreResult<()> {
        self.geo.remove(driver_id);
        Ok(())
    }

    async fn geo_radius(
        &self,
        center: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> StoreResult<Vec<GeoMatch>> {
        let mut matches: Vec<GeoMatch> = self
            .geo
            .iter()
            .filter_map(|entry| {
                let distance_m = haversine_m(&center, entry.value());
                (distance_m <= radius_m).then(|| GeoMatch {
                    driver_id: entry.key().clone(),
                    distance_m,
                    point: *entry.value(),
                })
            })
            .collect();

        matches.sort_by(|a, b| {
            a.distance_m
                .total_cmp(&b.distance_m)
                .then_with(|| a.driver_id.cmp(&b.driver_id))
        });
        matches.truncate(limit);

        Ok(matches)
    }

    async fn replace_assignment(
        &self,
        trip_id: &str,
        record: AssignmentRecord,
        ttl: Duration,
    ) -> StoreResult<()> {
        let expires_at_ms = self.expiry_from_now(ttl);
        self.assignments
            .insert(trip_id.to_string(), Expiring::new(record, expires_at_ms));
        Ok(())
    }

    async fn assignment(&self, trip_id: &str) -> StoreResult<Option<AssignmentRecord>> {
        let now_ms = self.clock.now_ms();
        Ok(self
            .assignments
            .get(trip_id)
            .filter(|entry| entry.is_live(now_ms))
            .map(|entry| entry.value.clone()))
    }

    async fn claim(
        &self,
        trip_id: &str,
        driver_id: &str,
        now_ms: i64,
    ) -> StoreResult<ClaimOutcome> {
        let presence = || self.live_presence(driver_id, now_ms);

        // the entry guard is held for the whole decision
        let outcome = match self.assignments.get_mut(trip_id) {
            Some(mut entry) => {
                let live = entry.is_live(now_ms);
                let record = live.then_some(&mut entry.value);
                apply_claim(record, driver_id, now_ms, presence)
            }
            None => apply_claim(None, driver_id, now_ms, presence),
        };

        Ok(outcome)
    }

    async fn remove_assignment(&self, trip_id: &str) -> StoreResult<()> {
        self.assignments.remove(trip_id);
        Ok(())
    }

    async fn purge_expired(&self, now_ms: i64) -> StoreResult<usize> {
        let before = self.presence.len() + self.assignments.len();
        self.presence.retain(|_, entry| entry.is_live(now_ms));
        self.assignments.retain(|_, entry| entry.is_live(now_ms));
        let after = self.presence.len() + self.assignments.len();

        Ok(before.saturating_sub(after))
    }
}
