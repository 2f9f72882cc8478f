use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::observability::metrics::Metrics;
use crate::store::Store;

pub async fn run_expiry_sweeper(
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    metrics: Metrics,
    every: Duration,
) {
    info!(interval_ms = every.as_millis() as u64, "expiry sweeper started");

    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        match store.purge_expired(clock.now_ms()).await {
            Ok(0) => {}
            Ok(purged) => {
                metrics.expired_entries_purged_total.inc_by(purged as u64);
                debug!(purged, "expired entries reclaimed");
            }
            Err(err) => {
                metrics
                    .store_errors_total
                    .with_label_values(&["purge_expired"])
                    .inc();
                warn!(error = %err, "expiry sweep failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::run_expiry_sweeper;
    use crate::clock::ManualClock;
    use crate::models::assignment::AssignmentRecord;
    use crate::observability::metrics::Metrics;
    use crate::store::{InMemoryStore, Store};

    #[tokio::test]
    async fn sweeper_reclaims_expired_offers() {
        let clock = Arc::new(ManualClock::new(0));
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        store
            .replace_assignment(
                "t1",
                AssignmentRecord::prepared(["d1".to_string()], 1_000),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        clock.advance_ms(2_000);

        let metrics = Metrics::new();
        let handle = tokio::spawn(run_expiry_sweeper(
            store.clone(),
            clock,
            metrics.clone(),
            Duration::from_millis(10),
        ));

        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert_eq!(metrics.expired_entries_purged_total.get(), 1);
    }
}
