pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::models::trip::{NewTrip, Trip, TripFilter, TripPatch};

/// Persistence seam for trip records. The engine never caches trips in
/// memory; the store is the source of truth for the conflict check.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Assigns an id, persists and returns the stored record.
    async fn create(&self, new: NewTrip) -> Result<Trip, EngineError>;

    async fn get(&self, id: &str) -> Result<Trip, EngineError>;

    /// The single open trip for a vehicle, if any. Under an override two
    /// open trips can coexist; this returns the most recently started one.
    async fn find_open_by_vehicle(&self, vehicle_id: &str) -> Result<Option<Trip>, EngineError>;

    /// All currently open trips, fleet-wide, most recent first.
    async fn list_open(&self) -> Result<Vec<Trip>, EngineError>;

    /// Filtered history, ordered by `started_at` descending.
    async fn list_by_filter(&self, filter: &TripFilter) -> Result<Vec<Trip>, EngineError>;

    /// Partial update; the whole patch applies or nothing does.
    async fn update(&self, id: &str, patch: &TripPatch) -> Result<Trip, EngineError>;

    /// Unconditional hard delete. A second delete of the same id fails with
    /// `NotFound`; idempotence is deliberately not provided.
    async fn delete(&self, id: &str) -> Result<(), EngineError>;
}

/// Read/write access to the cached per-vehicle "last known" odometer.
/// Vehicles themselves are external master data.
#[async_trait]
pub trait VehicleDirectory: Send + Sync {
    async fn last_known_odometer(&self, vehicle_id: &str) -> Result<Option<f64>, EngineError>;

    async fn record_odometer(&self, vehicle_id: &str, reading: f64) -> Result<(), EngineError>;
}
