use std::sync::Arc;

use chrono::Utc;
use frota::engine::build_engine;
use frota::engine::ghost::GhostSweeper;
use frota::engine::lifecycle::{OpenRequest, TripLifecycle};
use frota::error::EngineError;
use frota::models::trip::{NewTrip, TripFilter, TripPatch};
use frota::store::memory::MemoryTripStore;
use frota::store::{TripStore, VehicleDirectory};

fn engine() -> (Arc<MemoryTripStore>, Arc<TripLifecycle>, Arc<GhostSweeper>) {
    let store = Arc::new(MemoryTripStore::new());
    let (lifecycle, sweeper) = build_engine(store.clone(), store.clone());
    (store, lifecycle, sweeper)
}

fn open_req(vehicle: &str, driver: &str, odometer: f64) -> OpenRequest {
    OpenRequest {
        vehicle_id: vehicle.into(),
        driver_id: driver.into(),
        supervisor_id: None,
        start_odometer: odometer,
        reference_last_odometer: None,
        start_evidence_url: None,
        allow_override: false,
        notes: None,
    }
}

#[tokio::test]
async fn second_open_for_same_vehicle_conflicts() {
    let (_store, lifecycle, _sweeper) = engine();
    let first = lifecycle.open(open_req("ABC1234", "ana", 50000.0)).await.unwrap();

    let err = lifecycle
        .open(open_req("ABC1234", "bruno", 50010.0))
        .await
        .unwrap_err();
    match err {
        EngineError::Conflict { existing } => assert_eq!(existing.id, first.trip.id),
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[tokio::test]
async fn override_succeeds_and_is_recorded_in_notes() {
    let (_store, lifecycle, _sweeper) = engine();
    let first = lifecycle.open(open_req("ABC1234", "ana", 50000.0)).await.unwrap();

    let mut req = open_req("ABC1234", "bruno", 50010.0);
    req.allow_override = true;
    let second = lifecycle.open(req).await.unwrap();

    assert!(second.override_applied);
    let notes = second.trip.notes.expect("override must be audited");
    assert!(notes.contains(&first.trip.id));
}

#[tokio::test]
async fn open_on_a_different_vehicle_does_not_conflict() {
    let (_store, lifecycle, _sweeper) = engine();
    lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();
    lifecycle.open(open_req("XYZ9876", "bruno", 200.0)).await.unwrap();
}

#[tokio::test]
async fn close_below_start_is_blocked_and_trip_stays_open() {
    let (store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();

    let err = lifecycle
        .close(&opened.trip.id, 50.0, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOdometer { .. }));

    let stored = store.get(&opened.trip.id).await.unwrap();
    assert!(stored.is_open());
    assert_eq!(stored.end_odometer, None);
}

#[tokio::test]
async fn double_close_fails_with_already_closed() {
    let (_store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();

    lifecycle.close(&opened.trip.id, 180.0, None, None).await.unwrap();
    let err = lifecycle
        .close(&opened.trip.id, 200.0, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AlreadyClosed(id) if id == opened.trip.id));
}

#[tokio::test]
async fn low_start_odometer_warns_but_creates_the_trip() {
    let (store, lifecycle, _sweeper) = engine();
    let mut req = open_req("ABC1234", "ana", 100.0);
    req.reference_last_odometer = Some(500.0);

    let outcome = lifecycle.open(req).await.unwrap();
    assert!(outcome.warning.is_some());
    assert!(store.get(&outcome.trip.id).await.is_ok());
}

#[tokio::test]
async fn close_updates_the_vehicle_cached_odometer() {
    let (store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();
    assert_eq!(store.last_known_odometer("ABC1234").await.unwrap(), None);

    lifecycle.close(&opened.trip.id, 250.0, None, None).await.unwrap();
    assert_eq!(
        store.last_known_odometer("ABC1234").await.unwrap(),
        Some(250.0)
    );

    // A later open below the cached reading now warns without an explicit
    // reference from the caller.
    let outcome = lifecycle.open(open_req("ABC1234", "bruno", 200.0)).await.unwrap();
    assert!(outcome.warning.is_some());
}

#[tokio::test]
async fn force_close_records_the_reason_and_keeps_the_block() {
    let (_store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();

    let err = lifecycle
        .force_close(&opened.trip.id, 50.0, "driver unreachable")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidOdometer { .. }));

    let closed = lifecycle
        .force_close(&opened.trip.id, 300.0, "driver unreachable")
        .await
        .unwrap();
    assert!(!closed.is_open());
    assert!(closed.notes.unwrap().contains("closed manually: driver unreachable"));
}

#[tokio::test]
async fn amend_round_trip_changes_only_the_patched_field() {
    let (store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();
    let before = opened.trip.clone();

    let patch = TripPatch {
        start_odometer: Some(120.0),
        ..TripPatch::default()
    };
    lifecycle.amend(&before.id, &patch).await.unwrap();

    let after = store.get(&before.id).await.unwrap();
    assert_eq!(after.start_odometer, 120.0);
    assert_eq!(after.vehicle_id, before.vehicle_id);
    assert_eq!(after.driver_id, before.driver_id);
    assert_eq!(after.started_at, before.started_at);
    assert_eq!(after.ended_at, before.ended_at);
    assert_eq!(after.notes, before.notes);
}

#[tokio::test]
async fn amend_that_breaks_odometer_order_is_rejected_atomically() {
    let (store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();
    lifecycle.close(&opened.trip.id, 200.0, None, None).await.unwrap();

    // Raising the start above the recorded end must fail without touching
    // the record.
    let patch = TripPatch {
        start_odometer: Some(500.0),
        ..TripPatch::default()
    };
    let err = lifecycle.amend(&opened.trip.id, &patch).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidOdometer { .. }));

    let stored = store.get(&opened.trip.id).await.unwrap();
    assert_eq!(stored.start_odometer, 100.0);
    assert_eq!(stored.end_odometer, Some(200.0));
}

#[tokio::test]
async fn amend_cannot_mark_closed_without_an_end_odometer() {
    let (_store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();

    let patch = TripPatch {
        ended_at: Some(Some(Utc::now())),
        ..TripPatch::default()
    };
    let err = lifecycle.amend(&opened.trip.id, &patch).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));
}

#[tokio::test]
async fn amend_cannot_reopen_a_closed_trip() {
    let (store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();
    lifecycle.close(&opened.trip.id, 200.0, None, None).await.unwrap();

    // Clearing the end time while the end odometer survives would revive
    // the trip as OPEN; that transition does not exist.
    let patch = TripPatch {
        ended_at: Some(None),
        ..TripPatch::default()
    };
    let err = lifecycle.amend(&opened.trip.id, &patch).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    // Clearing both end fields together is still a reopening and is
    // rejected the same way.
    let patch = TripPatch {
        ended_at: Some(None),
        end_odometer: Some(None),
        ..TripPatch::default()
    };
    let err = lifecycle.amend(&opened.trip.id, &patch).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let stored = store.get(&opened.trip.id).await.unwrap();
    assert!(!stored.is_open());
    assert_eq!(stored.end_odometer, Some(200.0));
}

#[tokio::test]
async fn amend_cannot_give_an_open_trip_an_end_odometer() {
    let (store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();

    let patch = TripPatch {
        end_odometer: Some(Some(150.0)),
        ..TripPatch::default()
    };
    let err = lifecycle.amend(&opened.trip.id, &patch).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    let stored = store.get(&opened.trip.id).await.unwrap();
    assert!(stored.is_open());
    assert_eq!(stored.end_odometer, None);
}

#[tokio::test]
async fn delete_is_unconditional_and_not_idempotent() {
    let (_store, lifecycle, _sweeper) = engine();
    let opened = lifecycle.open(open_req("ABC1234", "ana", 100.0)).await.unwrap();

    lifecycle.delete(&opened.trip.id).await.unwrap();
    let err = lifecycle.delete(&opened.trip.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn sweep_removes_only_ghosts() {
    let (store, lifecycle, sweeper) = engine();
    let opened = lifecycle.open(open_req("DUP0001", "ana", 300.0)).await.unwrap();

    // A retried request left behind an exact duplicate with no driver.
    store
        .create(NewTrip {
            vehicle_id: "DUP0001".into(),
            driver_id: "".into(),
            supervisor_id: None,
            started_at: opened.trip.started_at,
            start_odometer: opened.trip.start_odometer,
            start_evidence_url: None,
            notes: None,
        })
        .await
        .unwrap();

    let result = sweeper.sweep("DUP0001").await.unwrap();
    assert_eq!(result.removed_count, 1);

    let remaining = store
        .list_by_filter(&TripFilter::for_vehicle("DUP0001"))
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, opened.trip.id);
}

#[tokio::test]
async fn concurrent_opens_for_one_vehicle_yield_exactly_one_trip() {
    let (_store, lifecycle, _sweeper) = engine();

    let a = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.open(open_req("RACE001", "ana", 100.0)).await })
    };
    let b = {
        let lifecycle = lifecycle.clone();
        tokio::spawn(async move { lifecycle.open(open_req("RACE001", "bruno", 100.0)).await })
    };

    let results = [a.await.unwrap(), b.await.unwrap()];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::Conflict { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(conflicts, 1);
}

#[tokio::test]
async fn open_listing_shows_only_open_trips() {
    let (store, lifecycle, _sweeper) = engine();
    let first = lifecycle.open(open_req("V1", "ana", 100.0)).await.unwrap();
    let second = lifecycle.open(open_req("V2", "bruno", 200.0)).await.unwrap();
    lifecycle.close(&first.trip.id, 150.0, None, None).await.unwrap();

    let open = store.list_open().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, second.trip.id);
}
