use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::engine::conflict::ConflictGuard;
use crate::engine::locks::VehicleLocks;
use crate::engine::odometer::{OdometerPolicy, Severity};
use crate::error::EngineError;
use crate::models::trip::{append_note, NewTrip, Trip, TripPatch};
use crate::store::{TripStore, VehicleDirectory};

/// Request to open a trip. `reference_last_odometer` overrides the cached
/// vehicle reading for the plausibility check; when absent the directory
/// value is used.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub vehicle_id: String,
    pub driver_id: String,
    pub supervisor_id: Option<String>,
    pub start_odometer: f64,
    pub reference_last_odometer: Option<f64>,
    pub start_evidence_url: Option<String>,
    pub allow_override: bool,
    pub notes: Option<String>,
}

/// A successful open, plus whatever the caller must relay to the human:
/// the advisory odometer warning and whether an override was applied.
#[derive(Debug, Clone)]
pub struct OpenOutcome {
    pub trip: Trip,
    pub warning: Option<String>,
    pub override_applied: bool,
}

/// The trip state machine: OPEN on creation, CLOSED via `close` or
/// `force_close`, amendable in either state, no reopening. All operations
/// for one vehicle are serialized through `VehicleLocks`.
pub struct TripLifecycle {
    store: Arc<dyn TripStore>,
    vehicles: Arc<dyn VehicleDirectory>,
    policy: OdometerPolicy,
    guard: ConflictGuard,
    locks: VehicleLocks,
}

impl TripLifecycle {
    pub fn new(
        store: Arc<dyn TripStore>,
        vehicles: Arc<dyn VehicleDirectory>,
        locks: VehicleLocks,
    ) -> Self {
        let guard = ConflictGuard::new(store.clone());
        Self {
            store,
            vehicles,
            policy: OdometerPolicy,
            guard,
            locks,
        }
    }

    pub async fn open(&self, req: OpenRequest) -> Result<OpenOutcome, EngineError> {
        if req.vehicle_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("vehicle id is required".into()));
        }
        if req.driver_id.trim().is_empty() {
            return Err(EngineError::InvalidInput("driver id is required".into()));
        }

        let lock = self.locks.lock_for(&req.vehicle_id);
        let _guard = lock.lock().await;

        let check = self
            .guard
            .check_before_open(&req.vehicle_id, req.allow_override)
            .await?;
        if let Some(existing) = &check.existing {
            if !check.overridden {
                warn!(
                    vehicle = %req.vehicle_id,
                    existing_trip = %existing.id,
                    "open refused: vehicle already in use"
                );
                return Err(EngineError::Conflict {
                    existing: Box::new(existing.clone()),
                });
            }
        }

        let reference = match req.reference_last_odometer {
            Some(value) => value,
            None => self
                .vehicles
                .last_known_odometer(&req.vehicle_id)
                .await?
                .unwrap_or(0.0),
        };
        let decision = self.policy.validate_start(req.start_odometer, reference)?;
        if decision.severity == Severity::Warn {
            warn!(
                vehicle = %req.vehicle_id,
                candidate = req.start_odometer,
                reference,
                "start odometer below last known reading, proceeding as advisory"
            );
        }

        let mut notes = req.notes.clone();
        let override_applied = check.conflict && check.overridden;
        if override_applied {
            if let Some(existing) = &check.existing {
                let line = format!(
                    "override: opened while trip {} was still open for this vehicle",
                    existing.id
                );
                notes = Some(append_note(notes.as_deref(), &line));
            }
        }

        let trip = self
            .store
            .create(NewTrip {
                vehicle_id: req.vehicle_id,
                driver_id: req.driver_id,
                supervisor_id: req.supervisor_id,
                started_at: Utc::now(),
                start_odometer: req.start_odometer,
                start_evidence_url: req.start_evidence_url,
                notes,
            })
            .await?;
        info!(
            trip = %trip.id,
            vehicle = %trip.vehicle_id,
            driver = %trip.driver_id,
            override_applied,
            "trip opened"
        );

        Ok(OpenOutcome {
            trip,
            warning: decision.message,
            override_applied,
        })
    }

    pub async fn close(
        &self,
        trip_id: &str,
        end_odometer: f64,
        end_evidence_url: Option<String>,
        notes: Option<String>,
    ) -> Result<Trip, EngineError> {
        self.close_inner(trip_id, end_odometer, end_evidence_url, notes, None)
            .await
    }

    /// Administrative completion for trips a driver never closed out. The
    /// reason always lands in the audit notes; the end-below-start block is
    /// not bypassed.
    pub async fn force_close(
        &self,
        trip_id: &str,
        end_odometer: f64,
        reason: &str,
    ) -> Result<Trip, EngineError> {
        if reason.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "a reason is required to close a trip manually".into(),
            ));
        }
        self.close_inner(trip_id, end_odometer, None, None, Some(reason))
            .await
    }

    async fn close_inner(
        &self,
        trip_id: &str,
        end_odometer: f64,
        end_evidence_url: Option<String>,
        notes: Option<String>,
        manual_reason: Option<&str>,
    ) -> Result<Trip, EngineError> {
        let trip = self.store.get(trip_id).await?;
        let lock = self.locks.lock_for(&trip.vehicle_id);
        let _guard = lock.lock().await;

        // Re-read under the lock; the first read only located the vehicle.
        let trip = self.store.get(trip_id).await?;
        if trip.ended_at.is_some() {
            return Err(EngineError::AlreadyClosed(trip.id));
        }

        let decision = self.policy.validate_end(end_odometer, trip.start_odometer)?;
        if decision.severity == Severity::Block {
            return Err(EngineError::InvalidOdometer {
                trip_id: trip.id,
                start: trip.start_odometer,
                end: end_odometer,
            });
        }

        let mut merged = trip.notes.clone();
        if let Some(extra) = notes.as_deref().filter(|n| !n.trim().is_empty()) {
            merged = Some(append_note(merged.as_deref(), extra));
        }
        if let Some(reason) = manual_reason {
            merged = Some(append_note(
                merged.as_deref(),
                &format!("closed manually: {reason}"),
            ));
        }

        let patch = TripPatch {
            ended_at: Some(Some(Utc::now())),
            end_odometer: Some(Some(end_odometer)),
            end_evidence_url: end_evidence_url.map(Some),
            notes: merged.map(Some),
            ..TripPatch::default()
        };
        let updated = self.store.update(trip_id, &patch).await?;

        // "Last known" means the last completed trip's end reading.
        self.vehicles
            .record_odometer(&updated.vehicle_id, end_odometer)
            .await?;
        info!(
            trip = %updated.id,
            vehicle = %updated.vehicle_id,
            end_odometer,
            manual = manual_reason.is_some(),
            "trip closed"
        );
        Ok(updated)
    }

    /// Field correction in either state, no state transition. The patched
    /// record is validated before anything is written, so a rejected
    /// amendment leaves the trip untouched.
    pub async fn amend(&self, trip_id: &str, patch: &TripPatch) -> Result<Trip, EngineError> {
        let trip = self.store.get(trip_id).await?;
        let lock = self.locks.lock_for(&trip.vehicle_id);
        let _guard = lock.lock().await;

        let current = self.store.get(trip_id).await?;
        let mut candidate = current.clone();
        patch.apply(&mut candidate);

        if !current.is_open() && candidate.is_open() {
            return Err(EngineError::InvalidInput(
                "a closed trip cannot be reopened; create a new trip instead".into(),
            ));
        }
        if let Some(vehicle_id) = &patch.vehicle_id {
            if vehicle_id.trim().is_empty() {
                return Err(EngineError::InvalidInput("vehicle id is required".into()));
            }
        }
        if let Some(driver_id) = &patch.driver_id {
            if driver_id.trim().is_empty() {
                return Err(EngineError::InvalidInput("driver id is required".into()));
            }
        }
        if candidate.ended_at.is_some() && candidate.end_odometer.is_none() {
            return Err(EngineError::InvalidInput(
                "a closed trip must carry an end odometer".into(),
            ));
        }
        if candidate.ended_at.is_none() && candidate.end_odometer.is_some() {
            return Err(EngineError::InvalidInput(
                "an open trip cannot carry an end odometer".into(),
            ));
        }
        if !candidate.start_odometer.is_finite() || candidate.start_odometer <= 0.0 {
            return Err(EngineError::InvalidInput(
                "start odometer must be greater than zero".into(),
            ));
        }
        if let Some(end) = candidate.end_odometer {
            let decision = self.policy.validate_end(end, candidate.start_odometer)?;
            if decision.severity == Severity::Block {
                return Err(EngineError::InvalidOdometer {
                    trip_id: candidate.id,
                    start: candidate.start_odometer,
                    end,
                });
            }
        }

        let updated = self.store.update(trip_id, patch).await?;
        info!(trip = %updated.id, vehicle = %updated.vehicle_id, "trip amended");
        Ok(updated)
    }

    /// Unconditional, irreversible removal. Downstream reports recompute on
    /// the next read; there is no tombstone.
    pub async fn delete(&self, trip_id: &str) -> Result<(), EngineError> {
        let trip = self.store.get(trip_id).await?;
        let lock = self.locks.lock_for(&trip.vehicle_id);
        let _guard = lock.lock().await;

        self.store.delete(trip_id).await?;
        info!(trip = %trip_id, vehicle = %trip.vehicle_id, "trip deleted");
        Ok(())
    }
}
