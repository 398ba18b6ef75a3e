#![allow(dead_code)]

use ride_core::clock::ManualClock;
use ride_core::lifecycle::RequestLifecycleController;
use ride_core::request::{RideDraft, RideKind};
use ride_core::store::RequestRecordStore;
use ride_core::test_helpers::{test_clock, test_pickup};
use ride_core::zones::Zone;

/// Controller over `store` driven by a manual clock the test keeps a handle to.
pub fn controller<S: RequestRecordStore>(
    store: S,
) -> (RequestLifecycleController<S, ManualClock>, ManualClock) {
    let clock = test_clock();
    (RequestLifecycleController::new(store, clock.clone()), clock)
}

/// Destination trip to the annex with a 2 km route (fare 80.00).
pub fn annex_trip() -> RideDraft {
    RideDraft::new(RideKind::DestinationTrip)
        .with_pickup(test_pickup())
        .with_destination(Zone::Annex)
        .with_route_distance_km(2.0)
}

/// Zone-only parcel delivery to the annex (fare 70.00).
pub fn annex_parcel() -> RideDraft {
    RideDraft::new(RideKind::Parcel)
        .with_destination(Zone::Annex)
        .with_description("Lab notebook for Ms. Santos")
}
