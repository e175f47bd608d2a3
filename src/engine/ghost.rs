use std::sync::Arc;

use tracing::info;

use crate::engine::locks::VehicleLocks;
use crate::error::EngineError;
use crate::models::trip::{Trip, TripFilter};
use crate::store::TripStore;

/// Decides whether a trip is a "ghost" — a record the system itself is
/// suspected of having created erroneously. What counts as a ghost is an
/// operational policy and will change as the data-entry surface does, so
/// the rule stays swappable.
pub trait GhostPredicate: Send + Sync {
    /// `siblings` is the vehicle's full trip list, including `trip` itself.
    fn is_ghost(&self, trip: &Trip, siblings: &[Trip]) -> bool;
}

/// Shipped default: a trip is a ghost when its driver reference is blank,
/// or when it is an exact `started_at` + `start_odometer` duplicate of a
/// sibling. Duplicate groups keep one deterministic survivor (the smallest
/// id) so a sweep never empties a vehicle's history.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGhostPredicate;

impl GhostPredicate for DefaultGhostPredicate {
    fn is_ghost(&self, trip: &Trip, siblings: &[Trip]) -> bool {
        if trip.driver_id.trim().is_empty() {
            return true;
        }
        siblings.iter().any(|other| {
            other.id != trip.id
                && other.started_at == trip.started_at
                && other.start_odometer == trip.start_odometer
                && other.id < trip.id
        })
    }
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    pub removed_count: usize,
}

/// Administrative purge of ghost trips for one vehicle. Irreversible and
/// unconditional; the human confirmation step lives at the caller boundary.
pub struct GhostSweeper {
    store: Arc<dyn TripStore>,
    locks: VehicleLocks,
    predicate: Arc<dyn GhostPredicate>,
}

impl GhostSweeper {
    pub fn new(
        store: Arc<dyn TripStore>,
        locks: VehicleLocks,
        predicate: Arc<dyn GhostPredicate>,
    ) -> Self {
        Self {
            store,
            locks,
            predicate,
        }
    }

    pub async fn sweep(&self, vehicle_id: &str) -> Result<SweepResult, EngineError> {
        let lock = self.locks.lock_for(vehicle_id);
        let _guard = lock.lock().await;

        let trips = self
            .store
            .list_by_filter(&TripFilter::for_vehicle(vehicle_id))
            .await?;
        let ghosts: Vec<&Trip> = trips
            .iter()
            .filter(|trip| self.predicate.is_ghost(trip, &trips))
            .collect();

        let mut removed_count = 0;
        for ghost in ghosts {
            self.store.delete(&ghost.id).await?;
            removed_count += 1;
        }
        info!(vehicle = %vehicle_id, removed_count, "ghost sweep finished");
        Ok(SweepResult { removed_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn trip(id: &str, driver: &str, odo: f64) -> Trip {
        Trip {
            id: id.into(),
            vehicle_id: "V1".into(),
            driver_id: driver.into(),
            supervisor_id: None,
            started_at: Utc::now(),
            ended_at: None,
            start_odometer: odo,
            end_odometer: None,
            start_evidence_url: None,
            end_evidence_url: None,
            notes: None,
        }
    }

    #[test]
    fn blank_driver_is_a_ghost() {
        let ghost = trip("a", "  ", 100.0);
        assert!(DefaultGhostPredicate.is_ghost(&ghost, std::slice::from_ref(&ghost)));
    }

    #[test]
    fn exact_duplicate_keeps_one_survivor() {
        let started = Utc::now();
        let mut a = trip("a", "ana", 100.0);
        let mut b = trip("b", "ana", 100.0);
        a.started_at = started;
        b.started_at = started;
        let siblings = vec![a.clone(), b.clone()];

        assert!(!DefaultGhostPredicate.is_ghost(&a, &siblings));
        assert!(DefaultGhostPredicate.is_ghost(&b, &siblings));
    }

    #[test]
    fn distinct_trips_are_not_ghosts() {
        let a = trip("a", "ana", 100.0);
        let b = trip("b", "ana", 250.0);
        let siblings = vec![a.clone(), b.clone()];
        assert!(!DefaultGhostPredicate.is_ghost(&a, &siblings));
        assert!(!DefaultGhostPredicate.is_ghost(&b, &siblings));
    }
}
