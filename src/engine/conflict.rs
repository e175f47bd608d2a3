use std::sync::Arc;

use crate::error::EngineError;
use crate::models::trip::Trip;
use crate::store::TripStore;

/// Outcome of the pre-open conflict check. The engine never silently blocks
/// nor silently proceeds: a conflict without an override goes back to the
/// caller, who re-asks the human and retries with `allow_override`.
#[derive(Debug, Clone)]
pub struct ConflictResult {
    pub conflict: bool,
    pub existing: Option<Trip>,
    pub overridden: bool,
}

impl ConflictResult {
    fn clear() -> Self {
        Self {
            conflict: false,
            existing: None,
            overridden: false,
        }
    }
}

/// Detects whether opening a trip would leave a vehicle with two concurrent
/// open trips. Advisory check-then-act; the per-vehicle lock held by the
/// lifecycle is what makes it race-free.
#[derive(Clone)]
pub struct ConflictGuard {
    store: Arc<dyn TripStore>,
}

impl ConflictGuard {
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self { store }
    }

    pub async fn check_before_open(
        &self,
        vehicle_id: &str,
        allow_override: bool,
    ) -> Result<ConflictResult, EngineError> {
        let existing = self.store.find_open_by_vehicle(vehicle_id).await?;
        match existing {
            None => Ok(ConflictResult::clear()),
            Some(trip) => Ok(ConflictResult {
                conflict: true,
                existing: Some(trip),
                overridden: allow_override,
            }),
        }
    }
}
