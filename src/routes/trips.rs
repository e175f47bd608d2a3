use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::engine::ghost::SweepResult;
use crate::engine::lifecycle::OpenRequest;
use crate::error::EngineError;
use crate::models::trip::{Trip, TripFilter, TripPatch};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", post(open_trip).get(list_trips))
        .route("/trips/open", get(list_open_trips))
        .route("/trips/:id", get(get_trip).delete(delete_trip))
        .route("/trips/:id/close", post(close_trip))
        .route("/trips/:id/force-close", post(force_close_trip))
        .route("/trips/:id/amend", post(amend_trip))
        .route("/vehicles/:vehicle_id/sweep-ghosts", post(sweep_ghosts))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenTripBody {
    vehicle_id: String,
    driver_id: String,
    supervisor_id: Option<String>,
    start_odometer: f64,
    reference_last_odometer: Option<f64>,
    start_evidence_url: Option<String>,
    #[serde(default)]
    allow_override: bool,
    notes: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenTripResponse {
    trip: Trip,
    #[serde(skip_serializing_if = "Option::is_none")]
    warning: Option<String>,
    override_applied: bool,
}

async fn open_trip(
    State(state): State<AppState>,
    Json(body): Json<OpenTripBody>,
) -> Result<impl IntoResponse, EngineError> {
    let outcome = state
        .lifecycle
        .open(OpenRequest {
            vehicle_id: body.vehicle_id,
            driver_id: body.driver_id,
            supervisor_id: body.supervisor_id,
            start_odometer: body.start_odometer,
            reference_last_odometer: body.reference_last_odometer,
            start_evidence_url: body.start_evidence_url,
            allow_override: body.allow_override,
            notes: body.notes,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(OpenTripResponse {
            trip: outcome.trip,
            warning: outcome.warning,
            override_applied: outcome.override_applied,
        }),
    ))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CloseTripBody {
    end_odometer: f64,
    end_evidence_url: Option<String>,
    notes: Option<String>,
}

async fn close_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Json(body): Json<CloseTripBody>,
) -> Result<Json<Trip>, EngineError> {
    let trip = state
        .lifecycle
        .close(&trip_id, body.end_odometer, body.end_evidence_url, body.notes)
        .await?;
    Ok(Json(trip))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForceCloseBody {
    end_odometer: f64,
    reason: String,
}

async fn force_close_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Json(body): Json<ForceCloseBody>,
) -> Result<Json<Trip>, EngineError> {
    let trip = state
        .lifecycle
        .force_close(&trip_id, body.end_odometer, &body.reason)
        .await?;
    Ok(Json(trip))
}

async fn amend_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
    Json(patch): Json<TripPatch>,
) -> Result<Json<Trip>, EngineError> {
    let trip = state.lifecycle.amend(&trip_id, &patch).await?;
    Ok(Json(trip))
}

async fn delete_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, EngineError> {
    state.lifecycle.delete(&trip_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<String>,
) -> Result<Json<Trip>, EngineError> {
    let trip = state.store.get(&trip_id).await?;
    Ok(Json(trip))
}

async fn list_trips(
    State(state): State<AppState>,
    Query(filter): Query<TripFilter>,
) -> Result<Json<Vec<Trip>>, EngineError> {
    let trips = state.store.list_by_filter(&filter).await?;
    Ok(Json(trips))
}

async fn list_open_trips(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, EngineError> {
    let trips = state.store.list_open().await?;
    Ok(Json(trips))
}

async fn sweep_ghosts(
    State(state): State<AppState>,
    Path(vehicle_id): Path<String>,
) -> Result<Json<SweepResult>, EngineError> {
    let result = state.sweeper.sweep(&vehicle_id).await?;
    Ok(Json(result))
}
