mod support;

use std::time::Duration;

use ride_core::eta::{EtaClient, EtaDispatcher};
use ride_core::geo::Coordinates;
use ride_core::lifecycle::{zone_of, LifecycleEvent};
use ride_core::planner::TripPlanner;
use ride_core::request::{RequestStatus, RideDraft, RideKind};
use ride_core::routing::{RouteDistanceProvider, RouteSummary, RouteWatcher};
use ride_core::store::{load_live, JsonFileRecordStore, MemoryRecordStore};
use ride_core::test_helpers::{test_pickup, FixedEstimate};
use ride_core::zones::Zone;

use support::controller;

/// Road routing stub that always reports a 2 km, 6 minute route.
struct TwoKilometres;

impl RouteDistanceProvider for TwoKilometres {
    fn route(&self, _from: Coordinates, _to: Coordinates) -> Option<RouteSummary> {
        Some(RouteSummary {
            distance_km: 2.0,
            duration_secs: 360.0,
        })
    }
}

#[test]
fn destination_trip_from_map_click_to_rider_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("all_requests_queue.json");

    let mut planner = TripPlanner::new(RouteWatcher::new(TwoKilometres))
        .with_eta(EtaDispatcher::new(EtaClient::new(FixedEstimate::new(
            "~6 min, moderate traffic",
        ))));
    planner.set_pickup(test_pickup());
    let route = planner.select_destination(Zone::Annex).expect("route");
    assert_eq!(route.advisory_fare.to_string(), "₱80.00");
    assert_eq!(
        planner.wait_for_eta(Duration::from_secs(5)).as_deref(),
        Some("~6 min, moderate traffic")
    );

    let (mut controller, clock) = controller(JsonFileRecordStore::open(&path));
    let submission = controller
        .submit(&planner.draft(RideKind::DestinationTrip))
        .expect("submit");
    assert_eq!(submission.request.fare().to_fixed(), "80.00");
    assert_eq!(submission.request.status(), RequestStatus::Pending);
    assert_eq!(zone_of(&submission.request), Some(Zone::Annex));

    clock.advance(Duration::from_millis(2_999));
    assert!(controller.poll().is_empty());
    clock.advance(Duration::from_millis(1));
    let events = controller.poll();
    let [LifecycleEvent::Matched(matched)] = events.as_slice() else {
        panic!("expected one match, got {events:?}");
    };
    assert_eq!(matched.id(), submission.request.id());
    assert_eq!(
        events[0].notice(),
        "Rider found! Your request to Gordon College ANNEX Campus has been queued."
    );

    let live = load_live(controller.store()).expect("live");
    assert_eq!(live[0].status(), RequestStatus::Matched);
}

#[test]
fn pahatid_to_annex_costs_seventy() {
    let (mut controller, clock) = controller(MemoryRecordStore::new());
    let draft = RideDraft::new(RideKind::Parcel)
        .with_destination(Zone::Annex)
        .with_description("  Printed thesis, two copies  ");

    let quote = controller.quote(&draft).expect("quote");
    assert_eq!(quote.fare.to_string(), "₱70.00");

    let submission = controller.submit(&draft).expect("submit");
    assert_eq!(submission.request.description(), Some("Printed thesis, two copies"));
    assert!(submission.request.pickup_coordinates().is_none());

    clock.advance(Duration::from_millis(2_500));
    assert_eq!(controller.poll()[0].notice(), "Rider is on its way!");
}

#[test]
fn pickup_to_main_uses_base_fare() {
    let (mut controller, clock) = controller(MemoryRecordStore::new());
    let draft = RideDraft::new(RideKind::Pickup).with_destination(Zone::Main);
    let submission = controller.submit(&draft).expect("submit");
    assert_eq!(submission.request.fare().to_fixed(), "50.00");

    clock.advance(Duration::from_millis(2_000));
    assert_eq!(
        controller.poll()[0].notice(),
        "Request queued — rider will be assigned shortly."
    );
}
