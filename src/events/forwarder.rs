use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::events::EventSink;
use crate::models::event::LocationEvent;
use crate::observability::metrics::Metrics;

const BASE_BACKOFF_MS: u64 = 50;

#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::Sender<LocationEvent>,
    metrics: Metrics,
}

impl EventQueue {
    pub fn new(capacity: usize, metrics: Metrics) -> (Self, mpsc::Receiver<LocationEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx, metrics }, rx)
    }

    pub fn enqueue(&self, event: LocationEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => {
                self.metrics
                    .location_events_total
                    .with_label_values(&["queued"])
                    .inc();
                true
            }
            Err(TrySendError::Full(event)) => {
                self.metrics
                    .location_events_total
                    .with_label_values(&["dropped"])
                    .inc();
                warn!(driver_id = %event.driver_id, "location event queue full; event dropped");
                false
            }
            Err(TrySendError::Closed(event)) => {
                self.metrics
                    .location_events_total
                    .with_label_values(&["dropped"])
                    .inc();
                error!(driver_id = %event.driver_id, "location event forwarder gone; event dropped");
                false
            }
        }
    }
}

pub async fn run_event_forwarder(
    sink: Arc<dyn EventSink>,
    mut rx: mpsc::Receiver<LocationEvent>,
    metrics: Metrics,
    max_attempts: u32,
) {
    info!("location event forwarder started");

    while let Some(event) = rx.recv().await {
        let outcome = if deliver(sink.as_ref(), &event, max_attempts).await {
            "published"
        } else {
            "failed"
        };
        metrics
            .location_events_total
            .with_label_values(&[outcome])
            .inc();
    }

    warn!("location event forwarder stopped: queue channel closed");
}

async fn deliver(sink: &dyn EventSink, event: &LocationEvent, max_attempts: u32) -> bool {
    let attempts = max_attempts.max(1);

    for attempt in 1..=attempts {
        match sink.publish(&event.driver_id, event).await {
            Ok(()) => return true,
            Err(err) if attempt < attempts => {
                warn!(
                    driver_id = %event.driver_id,
                    attempt,
                    error = %err,
                    "location event publish failed; retrying"
                );
                sleep(Duration::from_millis(BASE_BACKOFF_MS << (attempt - 1).min(6))).await;
            }
            Err(err) => {
                error!(
                    driver_id = %event.driver_id,
                    attempts,
                    error = %err,
                    "location event lost after retries"
                );
            }
        }
    }

    false
}
