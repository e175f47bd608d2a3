pub mod conflict;
pub mod ghost;
pub mod lifecycle;
pub mod locks;
pub mod odometer;

use std::sync::Arc;

use crate::engine::ghost::{DefaultGhostPredicate, GhostPredicate, GhostSweeper};
use crate::engine::lifecycle::TripLifecycle;
use crate::engine::locks::VehicleLocks;
use crate::store::{TripStore, VehicleDirectory};

/// Wire the lifecycle and the sweeper over one store, sharing the vehicle
/// lock registry so a sweep and a close for the same vehicle serialize.
pub fn build_engine(
    store: Arc<dyn TripStore>,
    vehicles: Arc<dyn VehicleDirectory>,
) -> (Arc<TripLifecycle>, Arc<GhostSweeper>) {
    build_engine_with_predicate(store, vehicles, Arc::new(DefaultGhostPredicate))
}

pub fn build_engine_with_predicate(
    store: Arc<dyn TripStore>,
    vehicles: Arc<dyn VehicleDirectory>,
    predicate: Arc<dyn GhostPredicate>,
) -> (Arc<TripLifecycle>, Arc<GhostSweeper>) {
    let locks = VehicleLocks::new();
    let lifecycle = Arc::new(TripLifecycle::new(
        store.clone(),
        vehicles,
        locks.clone(),
    ));
    let sweeper = Arc::new(GhostSweeper::new(store, locks, predicate));
    (lifecycle, sweeper)
}
