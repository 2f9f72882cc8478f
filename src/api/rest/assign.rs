use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::models::assignment::{AssignmentRecord, ClaimOutcome};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/v1/assign/prepare", post(prepare))
        .route("/v1/assign/claim", post(claim))
        .route("/v1/assign/:trip_id", get(inspect).delete(cleanup))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRequest {
    pub trip_id: String,
    pub candidates: Vec<String>,
    pub ttl_seconds: Option<u64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareResponse {
    pub trip_id: String,
    pub expires_in_sec: u64,
    pub deadline_ms: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub trip_id: String,
    pub driver_id: String,
}

async fn prepare(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PrepareRequest>, JsonRejection>,
) -> Result<Json<PrepareResponse>, AppError> {
    let Json(payload) = payload?;
    let ttl = state.offer_ttl.resolve(payload.ttl_seconds).ok_or_else(|| {
        AppError::BadRequest(format!(
            "ttlSeconds must be in {}..={}",
            state.offer_ttl.min_secs, state.offer_ttl.max_secs
        ))
    })?;

    let record = state
        .coordinator
        .prepare(&payload.trip_id, &payload.candidates, ttl)
        .await?;

    Ok(Json(PrepareResponse {
        trip_id: payload.trip_id,
        expires_in_sec: ttl.as_secs(),
        deadline_ms: record.deadline_ms,
    }))
}

async fn claim(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ClaimRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload?;
    if payload.trip_id.trim().is_empty() || payload.driver_id.trim().is_empty() {
        return Err(AppError::BadRequest(
            "tripId and driverId are required".to_string(),
        ));
    }

    let outcome = state
        .coordinator
        .claim(&payload.trip_id, &payload.driver_id)
        .await?;

    let response = match outcome {
        ClaimOutcome::Claimed => (
            StatusCode::OK,
            Json(json!({ "tripId": payload.trip_id, "claimedBy": payload.driver_id })),
        ),
        rejected => (
            rejection_status(rejected),
            Json(json!({ "error": rejected.as_str(), "tripId": payload.trip_id })),
        ),
    };

    Ok(response.into_response())
}

fn rejection_status(outcome: ClaimOutcome) -> StatusCode {
    match outcome {
        ClaimOutcome::Claimed => StatusCode::OK,
        ClaimOutcome::NotCandidate => StatusCode::FORBIDDEN,
        ClaimOutcome::Expired | ClaimOutcome::AlreadyClaimed | ClaimOutcome::DriverOffline => {
            StatusCode::CONFLICT
        }
    }
}

async fn inspect(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> Result<Json<AssignmentRecord>, AppError> {
    let record = state
        .coordinator
        .inspect(&trip_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("trip {trip_id} has no open offer")))?;

    Ok(Json(record))
}

async fn cleanup(
    State(state): State<Arc<AppState>>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.coordinator.cleanup(&trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
