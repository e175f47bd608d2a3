use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::EngineError;
use crate::models::trip::{NewTrip, Trip, TripFilter, TripPatch};
use crate::store::{TripStore, VehicleDirectory};

/// In-memory adapter, used by tests and as a reference implementation of
/// the store contract.
#[derive(Default)]
pub struct MemoryTripStore {
    trips: RwLock<HashMap<String, Trip>>,
    odometers: RwLock<HashMap<String, f64>>,
}

impl MemoryTripStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sort_newest_first(trips: &mut [Trip]) {
    trips.sort_by(|a, b| b.started_at.cmp(&a.started_at));
}

#[async_trait]
impl TripStore for MemoryTripStore {
    async fn create(&self, new: NewTrip) -> Result<Trip, EngineError> {
        let trip = new.into_trip();
        let mut trips = self.trips.write().await;
        trips.insert(trip.id.clone(), trip.clone());
        Ok(trip)
    }

    async fn get(&self, id: &str) -> Result<Trip, EngineError> {
        let trips = self.trips.read().await;
        trips
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    async fn find_open_by_vehicle(&self, vehicle_id: &str) -> Result<Option<Trip>, EngineError> {
        let trips = self.trips.read().await;
        let mut open: Vec<Trip> = trips
            .values()
            .filter(|t| t.vehicle_id == vehicle_id && t.is_open())
            .cloned()
            .collect();
        sort_newest_first(&mut open);
        Ok(open.into_iter().next())
    }

    async fn list_open(&self) -> Result<Vec<Trip>, EngineError> {
        let trips = self.trips.read().await;
        let mut open: Vec<Trip> = trips.values().filter(|t| t.is_open()).cloned().collect();
        sort_newest_first(&mut open);
        Ok(open)
    }

    async fn list_by_filter(&self, filter: &TripFilter) -> Result<Vec<Trip>, EngineError> {
        let trips = self.trips.read().await;
        let mut matched: Vec<Trip> = trips
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        sort_newest_first(&mut matched);
        Ok(matched)
    }

    async fn update(&self, id: &str, patch: &TripPatch) -> Result<Trip, EngineError> {
        let mut trips = self.trips.write().await;
        let trip = trips
            .get_mut(id)
            .ok_or_else(|| EngineError::NotFound(id.to_string()))?;
        patch.apply(trip);
        Ok(trip.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), EngineError> {
        let mut trips = self.trips.write().await;
        trips
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl VehicleDirectory for MemoryTripStore {
    async fn last_known_odometer(&self, vehicle_id: &str) -> Result<Option<f64>, EngineError> {
        let odometers = self.odometers.read().await;
        Ok(odometers.get(vehicle_id).copied())
    }

    async fn record_odometer(&self, vehicle_id: &str, reading: f64) -> Result<(), EngineError> {
        let mut odometers = self.odometers.write().await;
        odometers.insert(vehicle_id.to_string(), reading);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn new_trip(vehicle: &str, driver: &str, odo: f64) -> NewTrip {
        NewTrip {
            vehicle_id: vehicle.into(),
            driver_id: driver.into(),
            supervisor_id: None,
            started_at: Utc::now(),
            start_odometer: odo,
            start_evidence_url: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn second_delete_of_same_id_fails() {
        let store = MemoryTripStore::new();
        let trip = store.create(new_trip("V1", "ana", 10.0)).await.unwrap();
        store.delete(&trip.id).await.unwrap();
        assert!(matches!(
            store.delete(&trip.id).await,
            Err(EngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn history_is_ordered_newest_first() {
        let store = MemoryTripStore::new();
        let mut older = new_trip("V1", "ana", 10.0);
        older.started_at = Utc::now() - Duration::hours(3);
        let older = store.create(older).await.unwrap();
        let newer = store.create(new_trip("V1", "ana", 20.0)).await.unwrap();

        let listed = store
            .list_by_filter(&TripFilter::for_vehicle("V1"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.id);
        assert_eq!(listed[1].id, older.id);
    }

    #[tokio::test]
    async fn filter_narrows_by_driver_and_window() {
        let store = MemoryTripStore::new();
        store.create(new_trip("V1", "ana", 10.0)).await.unwrap();
        store.create(new_trip("V1", "bruno", 20.0)).await.unwrap();

        let filter = TripFilter {
            vehicle_id: Some("V1".into()),
            driver_id: Some("bruno".into()),
            date_from: Some(Utc::now() - Duration::minutes(5)),
            date_to: None,
        };
        let listed = store.list_by_filter(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].driver_id, "bruno");
    }
}
