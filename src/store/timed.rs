use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::models::assignment::{AssignmentRecord, ClaimOutcome};
use crate::models::presence::{GeoPoint, PresencePatch, PresenceRecord};
use crate::store::{GeoMatch, Store, StoreError, StoreResult};

pub struct TimedStore {
    inner: Arc<dyn Store>,
    timeout: Duration,
}

impl TimedStore {
    pub fn new(inner: Arc<dyn Store>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    async fn bounded<T, F>(&self, op: &'static str, fut: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "store call timed out");
                Err(StoreError::Timeout {
                    op,
                    elapsed: self.timeout,
                })
            }
        }
    }
}

#[async_trait]
impl Store for TimedStore {
    async fn merge_presence(
        &self,
        driver_id: &str,
        patch: PresencePatch,
        ttl: Duration,
    ) -> StoreResult<()> {
        self.bounded("merge_presence", self.inner.merge_presence(driver_id, patch, ttl))
            .await
    }

    async fn presence(&self, driver_id: &str) -> StoreResult<Option<PresenceRecord>> {
        self.bounded("presence", self.inner.presence(driver_id)).await
    }

    async fn remove_presence(&self, driver_id: &str) -> StoreResult<()> {
        self.bounded("remove_presence", self.inner.remove_presence(driver_id))
            .await
    }

    async fn geo_add(&self, driver_id: &str, point: GeoPoint) -> StoreResult<()> {
        self.bounded("geo_add", self.inner.geo_add(driver_id, point)).await
    }

    async fn geo_remove(&self, driver_id: &str) -> StoreResult<()> {
        self.bounded("geo_remove", self.inner.geo_remove(driver_id)).await
    }

    async fn geo_radius(
        &self,
        center: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> StoreResult<Vec<GeoMatch>> {
        self.bounded("geo_radius", self.inner.geo_radius(center, radius_m, limit))
            .await
    }

    async fn replace_assignment(
        &self,
        trip_id: &str,
        record: AssignmentRecord,
        ttl: Duration,
    ) -> StoreResult<()> {
        self.bounded(
            "replace_assignment",
            self.inner.replace_assignment(trip_id, record, ttl),
        )
        .await
    }

    async fn assignment(&self, trip_id: &str) -> StoreResult<Option<AssignmentRecord>> {
        self.bounded("assignment", self.inner.assignment(trip_id)).await
    }

    async fn claim(
        &self,
        trip_id: &str,
        driver_id: &str,
        now_ms: i64,
    ) -> StoreResult<ClaimOutcome> {
        self.bounded("claim", self.inner.claim(trip_id, driver_id, now_ms))
            .await
    }

    async fn remove_assignment(&self, trip_id: &str) -> StoreResult<()> {
        self.bounded("remove_assignment", self.inner.remove_assignment(trip_id))
            .await
    }

    async fn purge_expired(&self, now_ms: i64) -> StoreResult<usize> {
        self.bounded("purge_expired", self.inner.purge_expired(now_ms))
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::TimedStore;
    use crate::models::assignment::{AssignmentRecord, ClaimOutcome};
    use crate::models::presence::{GeoPoint, PresencePatch, PresenceRecord};
    use crate::store::{GeoMatch, Store, StoreError, StoreResult};

    struct StallingStore;

    async fn stall<T>() -> StoreResult<T> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Err(StoreError::Unavailable("unreachable".to_string()))
    }

    #[async_trait]
    impl Store for StallingStore {
        async fn merge_presence(&self, _: &str, _: PresencePatch, _: Duration) -> StoreResult<()> {
            stall().await
        }
        async fn presence(&self, _: &str) -> StoreResult<Option<PresenceRecord>> {
            stall().await
        }
        async fn remove_presence(&self, _: &str) -> StoreResult<()> {
            stall().await
        }
        async fn geo_add(&self, _: &str, _: GeoPoint) -> StoreResult<()> {
            stall().await
        }
        async fn geo_remove(&self, _: &str) -> StoreResult<()> {
            stall().await
        }
        async fn geo_radius(&self, _: GeoPoint, _: f64, _: usize) -> StoreResult<Vec<GeoMatch>> {
            stall().await
        }
        async fn replace_assignment(
            &self,
            _: &str,
            _: AssignmentRecord,
            _: Duration,
        ) -> StoreResult<()> {
            stall().await
        }
        async fn assignment(&self, _: &str) -> StoreResult<Option<AssignmentRecord>> {
            stall().await
        }
        async fn claim(&self, _: &str, _: &str, _: i64) -> StoreResult<ClaimOutcome> {
            stall().await
        }
        async fn remove_assignment(&self, _: &str) -> StoreResult<()> {
            stall().await
        }
        async fn purge_expired(&self, _: i64) -> StoreResult<usize> {
            stall().await
        }
    }

    #[tokio::test]
    async fn stalled_claim_surfaces_as_timeout_not_outcome() {
        let store = TimedStore::new(Arc::new(StallingStore), Duration::from_millis(50));

        let err = store.claim("t1", "d1", 0).await.unwrap_err();

        assert_eq!(
            err,
            StoreError::Timeout {
                op: "claim",
                elapsed: Duration::from_millis(50)
            }
        );
    }
}
