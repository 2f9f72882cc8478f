pub mod forwarder;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::models::event::LocationEvent;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PublishError {
    #[error("event sink unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode event: {0}")]
    Encode(String),
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, key: &str, event: &LocationEvent) -> Result<(), PublishError>;
}

pub struct BroadcastSink {
    tx: broadcast::Sender<LocationEvent>,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<LocationEvent>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl EventSink for BroadcastSink {
    async fn publish(&self, _key: &str, event: &LocationEvent) -> Result<(), PublishError> {
        // no subscribers is not a delivery failure
        let _ = self.tx.send(event.clone());
        Ok(())
    }
}
