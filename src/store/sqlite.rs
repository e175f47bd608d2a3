use async_trait::async_trait;
use chrono::Utc;

use crate::db::DbPool;
use crate::error::EngineError;
use crate::models::trip::{NewTrip, Trip, TripFilter, TripPatch};
use crate::models::vehicle::VehicleOdometer;
use crate::store::{TripStore, VehicleDirectory};

const TRIP_COLUMNS: &str = "id, vehicle_id, driver_id, supervisor_id, started_at, ended_at, \
     start_odometer, end_odometer, start_evidence_url, end_evidence_url, notes";

/// Production adapter over the sqlite pool. Schema lives in `./migrations`.
#[derive(Clone)]
pub struct SqliteTripStore {
    pool: DbPool,
}

impl SqliteTripStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripStore for SqliteTripStore {
    async fn create(&self, new: NewTrip) -> Result<Trip, EngineError> {
        let trip = new.into_trip();
        sqlx::query(
            "INSERT INTO trips (id, vehicle_id, driver_id, supervisor_id, started_at, ended_at, \
             start_odometer, end_odometer, start_evidence_url, end_evidence_url, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&trip.id)
        .bind(&trip.vehicle_id)
        .bind(&trip.driver_id)
        .bind(&trip.supervisor_id)
        .bind(trip.started_at)
        .bind(trip.ended_at)
        .bind(trip.start_odometer)
        .bind(trip.end_odometer)
        .bind(&trip.start_evidence_url)
        .bind(&trip.end_evidence_url)
        .bind(&trip.notes)
        .execute(&self.pool)
        .await?;
        Ok(trip)
    }

    async fn get(&self, id: &str) -> Result<Trip, EngineError> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        trip.ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    async fn find_open_by_vehicle(&self, vehicle_id: &str) -> Result<Option<Trip>, EngineError> {
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips \
             WHERE vehicle_id = ?1 AND ended_at IS NULL \
             ORDER BY started_at DESC LIMIT 1"
        ))
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(trip)
    }

    async fn list_open(&self) -> Result<Vec<Trip>, EngineError> {
        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips \
             WHERE ended_at IS NULL ORDER BY started_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(trips)
    }

    async fn list_by_filter(&self, filter: &TripFilter) -> Result<Vec<Trip>, EngineError> {
        let trips = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips \
             WHERE (?1 IS NULL OR vehicle_id = ?1) \
               AND (?2 IS NULL OR driver_id = ?2) \
               AND (?3 IS NULL OR started_at >= ?3) \
               AND (?4 IS NULL OR started_at <= ?4) \
             ORDER BY started_at DESC"
        ))
        .bind(&filter.vehicle_id)
        .bind(&filter.driver_id)
        .bind(filter.date_from)
        .bind(filter.date_to)
        .fetch_all(&self.pool)
        .await?;
        Ok(trips)
    }

    async fn update(&self, id: &str, patch: &TripPatch) -> Result<Trip, EngineError> {
        // Read-modify-write inside one transaction so a partial patch can
        // never land. The engine's per-vehicle lock serializes writers.
        let mut tx = self.pool.begin().await?;
        let trip = sqlx::query_as::<_, Trip>(&format!(
            "SELECT {TRIP_COLUMNS} FROM trips WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let mut trip = trip.ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        patch.apply(&mut trip);

        sqlx::query(
            "UPDATE trips SET vehicle_id = ?2, driver_id = ?3, supervisor_id = ?4, \
             started_at = ?5, ended_at = ?6, start_odometer = ?7, end_odometer = ?8, \
             start_evidence_url = ?9, end_evidence_url = ?10, notes = ?11 \
             WHERE id = ?1",
        )
        .bind(&trip.id)
        .bind(&trip.vehicle_id)
        .bind(&trip.driver_id)
        .bind(&trip.supervisor_id)
        .bind(trip.started_at)
        .bind(trip.ended_at)
        .bind(trip.start_odometer)
        .bind(trip.end_odometer)
        .bind(&trip.start_evidence_url)
        .bind(&trip.end_evidence_url)
        .bind(&trip.notes)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(trip)
    }

    async fn delete(&self, id: &str) -> Result<(), EngineError> {
        let result = sqlx::query("DELETE FROM trips WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(EngineError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl VehicleDirectory for SqliteTripStore {
    async fn last_known_odometer(&self, vehicle_id: &str) -> Result<Option<f64>, EngineError> {
        let cached = sqlx::query_as::<_, VehicleOdometer>(
            "SELECT vehicle_id, last_known_odometer, updated_at \
             FROM vehicle_odometers WHERE vehicle_id = ?1",
        )
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(cached.map(|row| row.last_known_odometer))
    }

    async fn record_odometer(&self, vehicle_id: &str, reading: f64) -> Result<(), EngineError> {
        let row = VehicleOdometer {
            vehicle_id: vehicle_id.to_string(),
            last_known_odometer: reading,
            updated_at: Utc::now(),
        };
        sqlx::query(
            "INSERT INTO vehicle_odometers (vehicle_id, last_known_odometer, updated_at) \
             VALUES (?1, ?2, ?3) \
             ON CONFLICT (vehicle_id) DO UPDATE SET \
                 last_known_odometer = excluded.last_known_odometer, \
                 updated_at = excluded.updated_at",
        )
        .bind(&row.vehicle_id)
        .bind(row.last_known_odometer)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
