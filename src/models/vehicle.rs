use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached "last known" reading for a vehicle, updated when a trip closes.
/// The vehicle itself is external master data; this engine only keeps the
/// reference value used when a new trip is opened.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VehicleOdometer {
    pub vehicle_id: String,
    pub last_known_odometer: f64,
    pub updated_at: DateTime<Utc>,
}
