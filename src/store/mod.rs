pub mod memory;
pub mod timed;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::assignment::{AssignmentRecord, ClaimOutcome};
use crate::models::presence::{GeoPoint, PresencePatch, PresenceRecord};

pub use memory::InMemoryStore;
pub use timed::TimedStore;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store call `{op}` timed out after {elapsed:?}")]
    Timeout { op: &'static str, elapsed: Duration },

    #[error("malformed store response: {0}")]
    Malformed(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, PartialEq)]
pub struct GeoMatch {
    pub driver_id: String,
    pub distance_m: f64,
    pub point: GeoPoint,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn merge_presence(
        &self,
        driver_id: &str,
        patch: PresencePatch,
        ttl: Duration,
    ) -> StoreResult<()>;

    async fn presence(&self, driver_id: &str) -> StoreResult<Option<PresenceRecord>>;

    async fn remove_presence(&self, driver_id: &str) -> StoreResult<()>;

    async fn geo_add(&self, driver_id: &str, point: GeoPoint) -> StoreResult<()>;

    async fn geo_remove(&self, driver_id: &str) -> StoreResult<()>;

    async fn geo_radius(
        &self,
        center: GeoPoint,
        radius_m: f64,
        limit: usize,
    ) -> StoreResult<Vec<GeoMatch>>;

    async fn replace_assignment(
        &self,
        trip_id: &str,
        record: AssignmentRecord,
        ttl: Duration,
    ) -> StoreResult<()>;

    async fn assignment(&self, trip_id: &str) -> StoreResult<Option<AssignmentRecord>>;

    /// Evaluates and applies a claim as one atomic step, see
    /// [`crate::models::assignment::apply_claim`] for the decision order.
    async fn claim(&self, trip_id: &str, driver_id: &str, now_ms: i64)
        -> StoreResult<ClaimOutcome>;

    async fn remove_assignment(&self, trip_id: &str) -> StoreResult<()>;

    async fn purge_expired(&self, now_ms: i64) -> StoreResult<usize>;
}

pub(crate) fn ttl_ms(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}
