//! Trip planning inputs for a destination trip: pickup, destination, route and ETA.
//!
//! Every change to pickup or destination recomputes the route. Whenever the (pickup,
//! destination, distance) triple changes and all three are known, a fresh ETA estimate
//! is requested; older estimates still in flight are discarded when they land. When the
//! inputs stop forming a complete request (no route, or a destination outside campus)
//! the ETA goes back to idle.

use std::time::Duration;

use crate::eta::{EstimationBackend, EtaDisplay, EtaDispatcher, EtaRequest};
use crate::geo::Coordinates;
use crate::request::{RideDraft, RideKind};
use crate::routing::{RouteDistanceProvider, RouteUpdate, RouteWatcher};
use crate::zones::{destination_for, Zone};

pub struct TripPlanner<P, B> {
    route: RouteWatcher<P>,
    eta: Option<EtaDispatcher<B>>,
    description: Option<String>,
}

impl<P: RouteDistanceProvider, B: EstimationBackend + 'static> TripPlanner<P, B> {
    pub fn new(route: RouteWatcher<P>) -> Self {
        Self {
            route,
            eta: None,
            description: None,
        }
    }

    pub fn with_eta(mut self, dispatcher: EtaDispatcher<B>) -> Self {
        self.eta = Some(dispatcher);
        self
    }

    pub fn set_pickup(&mut self, pickup: Coordinates) -> Option<RouteUpdate> {
        let update = self.route.set_pickup(pickup);
        self.refresh_eta();
        update
    }

    pub fn select_destination(&mut self, zone: Zone) -> Option<RouteUpdate> {
        let update = self.route.select_destination(zone);
        self.refresh_eta();
        update
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn route(&self) -> Option<RouteUpdate> {
        self.route.latest()
    }

    /// Current ETA display after applying any results that have arrived.
    pub fn eta(&mut self) -> EtaDisplay {
        match self.eta.as_mut() {
            Some(dispatcher) => {
                dispatcher.drain();
                dispatcher.board().display().clone()
            }
            None => EtaDisplay::Idle,
        }
    }

    /// Block up to `timeout` for the latest estimate.
    pub fn wait_for_eta(&mut self, timeout: Duration) -> Option<String> {
        self.eta
            .as_mut()
            .and_then(|dispatcher| dispatcher.wait(timeout).map(str::to_string))
    }

    /// Draft of the current inputs. Only destination trips carry the route distance.
    pub fn draft(&self, kind: RideKind) -> RideDraft {
        let mut draft = RideDraft::new(kind);
        if let Some(pickup) = self.route.pickup() {
            draft = draft.with_pickup(pickup);
        }
        if let Some(zone) = self.route.destination() {
            draft = draft.with_destination(zone);
        }
        if let Some(description) = &self.description {
            draft = draft.with_description(description.clone());
        }
        if kind == RideKind::DestinationTrip {
            if let Some(update) = self.route.latest() {
                draft = draft.with_route_distance_km(update.distance_km);
            }
        }
        draft
    }

    fn refresh_eta(&mut self) {
        let Some(dispatcher) = self.eta.as_mut() else {
            return;
        };
        match Self::eta_request(&self.route) {
            Some(request) => {
                dispatcher.request(request);
            }
            None => dispatcher.invalidate(),
        }
    }

    fn eta_request(route: &RouteWatcher<P>) -> Option<EtaRequest> {
        let update = route.latest()?;
        let pickup = route.pickup()?;
        let destination = destination_for(route.destination()?)?;
        Some(EtaRequest::new(update.distance_km, pickup, destination.name))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::eta::{EstimationError, EtaClient};
    use crate::routing::StraightLineRouteProvider;

    #[derive(Clone, Default)]
    struct Counting(Arc<AtomicUsize>);

    impl EstimationBackend for Counting {
        fn estimate(&self, request: &EtaRequest) -> Result<String, EstimationError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(format!("to {}", request.destination))
        }
    }

    fn planner(backend: Counting) -> TripPlanner<StraightLineRouteProvider, Counting> {
        TripPlanner::new(RouteWatcher::new(StraightLineRouteProvider::default()))
            .with_eta(EtaDispatcher::new(EtaClient::new(backend)))
    }

    #[test]
    fn estimates_only_once_all_inputs_are_known() {
        let backend = Counting::default();
        let mut planner = planner(backend.clone());

        planner.set_pickup(Coordinates::new(14.83, 120.28).unwrap());
        assert_eq!(planner.eta(), EtaDisplay::Idle);

        planner.select_destination(Zone::Annex);
        assert_eq!(
            planner.wait_for_eta(Duration::from_secs(5)).as_deref(),
            Some("to Gordon College ANNEX Campus")
        );
        assert_eq!(backend.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn reselecting_same_destination_does_not_reestimate() {
        let backend = Counting::default();
        let mut planner = planner(backend.clone());
        planner.set_pickup(Coordinates::new(14.83, 120.28).unwrap());
        planner.select_destination(Zone::Main);
        planner.wait_for_eta(Duration::from_secs(5));
        planner.select_destination(Zone::Main);
        planner.wait_for_eta(Duration::from_secs(5));
        assert_eq!(backend.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn draft_carries_route_distance_for_destination_trips_only() {
        let mut planner = planner(Counting::default());
        planner.set_pickup(Coordinates::new(14.83, 120.28).unwrap());
        let update = planner.select_destination(Zone::Annex).expect("route");

        let trip = planner.draft(RideKind::DestinationTrip);
        assert_eq!(trip.route_distance_km, Some(update.distance_km));
        assert_eq!(trip.destination, Some(Zone::Annex));

        let parcel = planner.draft(RideKind::Parcel);
        assert_eq!(parcel.route_distance_km, None);
    }
}
