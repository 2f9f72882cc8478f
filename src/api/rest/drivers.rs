use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::presence::{DriverStatus, PresenceRecord, Telemetry};
use crate::state::AppState;

const DEFAULT_RADIUS_M: f64 = 2_000.0;
const DEFAULT_LIMIT: usize = 20;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/drivers/nearby", get(nearby))
        .route("/v1/drivers/:id/status", post(update_status))
        .route("/v1/drivers/:id/location", put(update_location))
        .route("/v1/drivers/:id/presence", get(get_presence))
}

#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: DriverStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub driver_id: String,
    pub status: DriverStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_sec: Option<u64>,
}

#[derive(Deserialize)]
pub struct LocationRequest {
    pub lat: f64,
    pub lng: f64,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub ts: Option<i64>,
}

#[derive(Serialize)]
pub struct LocationAccepted {
    pub ingested: bool,
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    pub lat: f64,
    pub lng: f64,
    pub radius: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyDriverView {
    pub driver_id: String,
    pub distance: f64,
    pub lat: f64,
    pub lng: f64,
    pub status: DriverStatus,
    pub last_seen: i64,
}

#[derive(Serialize)]
pub struct NearbyResponse {
    pub count: usize,
    pub drivers: Vec<NearbyDriverView>,
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, AppError> {
    let Json(payload) = payload?;
    let online = payload.status == DriverStatus::Online;
    state.presence.set_status(&id, online).await?;

    Ok(Json(StatusResponse {
        driver_id: id,
        status: payload.status,
        expires_in_sec: online.then(|| state.presence.lease().as_secs()),
    }))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<LocationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LocationAccepted>), AppError> {
    let Json(payload) = payload?;
    let telemetry = Telemetry {
        speed: payload.speed,
        heading: payload.heading,
        ts: payload.ts,
    };
    state
        .presence
        .upsert_location(&id, payload.lat, payload.lng, telemetry)
        .await?;

    Ok((StatusCode::ACCEPTED, Json(LocationAccepted { ingested: true })))
}

async fn nearby(
    State(state): State<Arc<AppState>>,
    Query(query): Query<NearbyQuery>,
) -> Result<Json<NearbyResponse>, AppError> {
    let drivers = state
        .proximity
        .nearby(
            query.lat,
            query.lng,
            query.radius.unwrap_or(DEFAULT_RADIUS_M),
            query.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .await?;

    let drivers: Vec<NearbyDriverView> = drivers
        .into_iter()
        .map(|driver| NearbyDriverView {
            driver_id: driver.driver_id,
            distance: driver.distance,
            lat: driver.lat,
            lng: driver.lng,
            status: DriverStatus::Online,
            last_seen: driver.last_seen_ms,
        })
        .collect();

    Ok(Json(NearbyResponse {
        count: drivers.len(),
        drivers,
    }))
}

async fn get_presence(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<PresenceRecord>, AppError> {
    let record = state
        .presence
        .presence(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("driver {id} has no live presence")))?;

    Ok(Json(record))
}
