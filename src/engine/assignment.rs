use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::AppError;
use crate::models::assignment::{AssignmentRecord, ClaimOutcome};
use crate::observability::metrics::Metrics;
use crate::store::{ttl_ms, Store};

pub struct AssignmentCoordinator {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
}

impl AssignmentCoordinator {
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, metrics: Metrics) -> Self {
        Self {
            store,
            clock,
            metrics,
        }
    }

    pub async fn prepare(
        &self,
        trip_id: &str,
        candidates: &[String],
        ttl: Duration,
    ) -> Result<AssignmentRecord, AppError> {
        if trip_id.trim().is_empty() {
            return Err(AppError::BadRequest("tripId cannot be empty".to_string()));
        }
        if ttl.is_zero() {
            return Err(AppError::BadRequest("ttl must be > 0".to_string()));
        }
        let candidates = candidate_set(candidates)?;

        let deadline_ms = self.clock.now_ms().saturating_add(ttl_ms(ttl));
        let record = AssignmentRecord::prepared(candidates, deadline_ms);

        self.store
            .replace_assignment(trip_id, record.clone(), ttl)
            .await
            .inspect_err(|_| self.count_store_error("prepare"))?;

        self.metrics.offers_prepared_total.inc();
        info!(
            trip_id,
            candidates = record.candidates.len(),
            deadline_ms,
            "offer window prepared"
        );

        Ok(record)
    }

    pub async fn claim(&self, trip_id: &str, driver_id: &str) -> Result<ClaimOutcome, AppError> {
        let now_ms = self.clock.now_ms();
        let start = Instant::now();

        let result = self.store.claim(trip_id, driver_id, now_ms).await;
        let elapsed = start.elapsed().as_secs_f64();

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.count_store_error("claim");
                self.metrics
                    .claim_latency_seconds
                    .with_label_values(&["error"])
                    .observe(elapsed);
                warn!(trip_id, driver_id, error = %err, "claim outcome unknown");
                return Err(err.into());
            }
        };

        self.metrics
            .claims_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.metrics
            .claim_latency_seconds
            .with_label_values(&[outcome.as_str()])
            .observe(elapsed);

        if outcome.is_claimed() {
            info!(trip_id, driver_id, "trip claimed");
        } else {
            info!(trip_id, driver_id, outcome = outcome.as_str(), "claim rejected");
        }

        Ok(outcome)
    }

    pub async fn inspect(&self, trip_id: &str) -> Result<Option<AssignmentRecord>, AppError> {
        let record = self
            .store
            .assignment(trip_id)
            .await
            .inspect_err(|_| self.count_store_error("inspect"))?;
        Ok(record)
    }

    pub async fn cleanup(&self, trip_id: &str) -> Result<(), AppError> {
        self.store
            .remove_assignment(trip_id)
            .await
            .inspect_err(|_| self.count_store_error("cleanup"))?;
        info!(trip_id, "offer window cleaned up");
        Ok(())
    }

    fn count_store_error(&self, operation: &str) {
        self.metrics
            .store_errors_total
            .with_label_values(&[operation])
            .inc();
    }
}

fn candidate_set(candidates: &[String]) -> Result<BTreeSet<String>, AppError> {
    if candidates.is_empty() {
        return Err(AppError::BadRequest("candidates cannot be empty".to_string()));
    }

    let mut set = BTreeSet::new();
    for candidate in candidates {
        if candidate.trim().is_empty() {
            return Err(AppError::BadRequest(
                "candidate driver ids cannot be blank".to_string(),
            ));
        }
        set.insert(candidate.clone());
    }

    Ok(set)
}
