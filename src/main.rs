mod api;
mod clock;
mod config;
mod engine;
mod error;
mod events;
mod geo;
mod models;
mod observability;
mod presence;
mod proximity;
mod state;
mod store;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::clock::{Clock, SystemClock};
use crate::events::{BroadcastSink, EventSink};
use crate::store::{InMemoryStore, Store, TimedStore};

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let backend: Arc<dyn Store> = Arc::new(InMemoryStore::new(clock.clone()));
    let store: Arc<dyn Store> = Arc::new(TimedStore::new(backend, config.store_timeout()));

    let (app_state, event_rx) = state::AppState::new(store.clone(), clock.clone(), &config);
    let shared_state = Arc::new(app_state);

    let sink: Arc<dyn EventSink> =
        Arc::new(BroadcastSink::new(shared_state.location_events_tx.clone()));
    tokio::spawn(events::forwarder::run_event_forwarder(
        sink,
        event_rx,
        shared_state.metrics.clone(),
        config.publish_max_attempts,
    ));

    tokio::spawn(engine::sweeper::run_expiry_sweeper(
        store,
        clock,
        shared_state.metrics.clone(),
        config.sweep_interval(),
    ));

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        presence_ttl_secs = config.presence_ttl_secs,
        "driver stream started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
