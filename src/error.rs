use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::models::trip::Trip;

/// Failure taxonomy of the engine. Conflicts and odometer violations are
/// business outcomes the caller must surface to a human; `Storage` is an
/// infrastructure fault and the only variant safe to retry blindly.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("vehicle {} already has an open trip {}", .existing.vehicle_id, .existing.id)]
    Conflict { existing: Box<Trip> },
    #[error("end odometer {end} is below start odometer {start} for trip {trip_id}")]
    InvalidOdometer {
        trip_id: String,
        start: f64,
        end: f64,
    },
    #[error("trip {0} is already closed")]
    AlreadyClosed(String),
    #[error("trip not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl EngineError {
    fn kind(&self) -> &'static str {
        match self {
            EngineError::Config(_) => "config",
            EngineError::Io(_) => "io",
            EngineError::InvalidInput(_) => "invalid-input",
            EngineError::Conflict { .. } => "conflict",
            EngineError::InvalidOdometer { .. } => "invalid-odometer",
            EngineError::AlreadyClosed(_) => "already-closed",
            EngineError::NotFound(_) => "not-found",
            EngineError::Storage(_) => "storage",
            EngineError::Other(_) => "internal",
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match self {
            EngineError::Config(_)
            | EngineError::Io(_)
            | EngineError::Storage(_)
            | EngineError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::InvalidInput(_) | EngineError::InvalidOdometer { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            EngineError::Conflict { .. } | EngineError::AlreadyClosed(_) => StatusCode::CONFLICT,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        };

        let mut body = json!({
            "error": self.kind(),
            "message": self.to_string(),
        });
        match &self {
            EngineError::Conflict { existing } => {
                body["existingTrip"] = json!(existing);
            }
            EngineError::InvalidOdometer {
                trip_id,
                start,
                end,
            } => {
                body["tripId"] = json!(trip_id);
                body["startOdometer"] = json!(start);
                body["endOdometer"] = json!(end);
            }
            EngineError::AlreadyClosed(trip_id) | EngineError::NotFound(trip_id) => {
                body["tripId"] = json!(trip_id);
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}
