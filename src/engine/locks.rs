use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::Mutex;

/// Registry of per-vehicle async locks. Lifecycle operations and the ghost
/// sweep for one vehicle are serialized through the same mutex; different
/// vehicles never contend. Entries are never evicted; the map grows with
/// the fleet, not with traffic.
#[derive(Clone, Default)]
pub struct VehicleLocks {
    inner: Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl VehicleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock_for(&self, vehicle_id: &str) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().expect("vehicle lock registry poisoned");
        map.entry(vehicle_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_vehicle_returns_the_same_lock() {
        let locks = VehicleLocks::new();
        let a = locks.lock_for("V1");
        let b = locks.lock_for("V1");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn different_vehicles_do_not_contend() {
        let locks = VehicleLocks::new();
        let a = locks.lock_for("V1");
        let b = locks.lock_for("V2");
        let _ga = a.lock().await;
        // Would deadlock if V2 shared V1's mutex.
        let _gb = b.lock().await;
    }
}
