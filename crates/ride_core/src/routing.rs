//! Route distance providers and the watcher that recomputes routes on input changes.
//!
//! Two implementations of [`RouteDistanceProvider`]:
//!
//! - **`StraightLineRouteProvider`**: haversine distance with an average-speed duration.
//!   No external dependencies.
//! - **`OsrmRouteProvider`** (feature `http`): calls an OSRM HTTP endpoint.
//!
//! The provider's distance is the only distance the fare calculator accepts for a routed
//! trip. The fare carried in a [`RouteUpdate`] is advisory; the authoritative fare is
//! computed again at submission.

use crate::geo::{haversine_km, Coordinates};
use crate::pricing::{Fare, FareSchedule};
use crate::zones::{destination_for, Zone};

/// Distance and free-flow duration of one computed route.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_secs: f64,
}

pub trait RouteDistanceProvider {
    /// Compute a route between two points. Returns `None` if no route exists.
    fn route(&self, from: Coordinates, to: Coordinates) -> Option<RouteSummary>;
}

impl<P: RouteDistanceProvider + ?Sized> RouteDistanceProvider for Box<P> {
    fn route(&self, from: Coordinates, to: Coordinates) -> Option<RouteSummary> {
        (**self).route(from, to)
    }
}

/// Great-circle routing. Underestimates road distance but never fails.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StraightLineRouteProvider {
    pub average_speed_kmh: f64,
}

impl Default for StraightLineRouteProvider {
    fn default() -> Self {
        // Motorcycle average in campus traffic.
        Self {
            average_speed_kmh: 25.0,
        }
    }
}

impl RouteDistanceProvider for StraightLineRouteProvider {
    fn route(&self, from: Coordinates, to: Coordinates) -> Option<RouteSummary> {
        let distance_km = haversine_km(from, to);
        let duration_secs = if distance_km > 0.0 && self.average_speed_kmh > 0.0 {
            (distance_km / self.average_speed_kmh) * 3600.0
        } else {
            0.0
        };
        Some(RouteSummary {
            distance_km,
            duration_secs,
        })
    }
}

#[cfg(feature = "http")]
pub mod osrm {
    use std::time::Duration;

    use reqwest::blocking::Client;
    use serde::Deserialize;

    use super::{Coordinates, RouteDistanceProvider, RouteSummary};

    const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

    /// Routes via an OSRM HTTP endpoint (e.g. `http://localhost:5000`).
    #[derive(Debug, Clone)]
    pub struct OsrmRouteProvider {
        client: Client,
        endpoint: String,
    }

    impl OsrmRouteProvider {
        pub fn new(endpoint: &str) -> Result<Self, reqwest::Error> {
            let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
            Ok(Self {
                client,
                endpoint: endpoint.trim_end_matches('/').to_string(),
            })
        }

        fn route_url(&self, from: Coordinates, to: Coordinates) -> String {
            format!(
                "{}/route/v1/driving/{},{};{},{}?overview=false",
                self.endpoint,
                from.lng(),
                from.lat(),
                to.lng(),
                to.lat(),
            )
        }
    }

    #[derive(Deserialize)]
    struct OsrmResponse {
        code: String,
        routes: Option<Vec<OsrmRoute>>,
    }

    #[derive(Deserialize)]
    struct OsrmRoute {
        distance: f64, // metres
        duration: f64, // seconds
    }

    fn summarize(response: OsrmResponse) -> Option<RouteSummary> {
        if response.code != "Ok" {
            return None;
        }
        let route = response.routes?.into_iter().next()?;
        Some(RouteSummary {
            distance_km: route.distance / 1000.0,
            duration_secs: route.duration,
        })
    }

    impl RouteDistanceProvider for OsrmRouteProvider {
        fn route(&self, from: Coordinates, to: Coordinates) -> Option<RouteSummary> {
            let url = self.route_url(from, to);
            let response = match self.client.get(&url).send() {
                Ok(response) => response,
                Err(error) => {
                    tracing::warn!(%error, "osrm route request failed");
                    return None;
                }
            };
            match response.json::<OsrmResponse>() {
                Ok(parsed) => summarize(parsed),
                Err(error) => {
                    tracing::warn!(%error, "osrm route response unreadable");
                    None
                }
            }
        }
    }

}

#[cfg(feature = "http")]
pub use osrm::OsrmRouteProvider;

/// Recomputed route for the current pickup and destination.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RouteUpdate {
    pub distance_km: f64,
    pub duration_secs: f64,
    pub advisory_fare: Fare,
}

/// Tracks pickup and destination and recomputes the route whenever either changes.
pub struct RouteWatcher<P> {
    provider: P,
    fares: FareSchedule,
    pickup: Option<Coordinates>,
    destination: Option<Zone>,
    latest: Option<RouteUpdate>,
}

impl<P: RouteDistanceProvider> RouteWatcher<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            fares: FareSchedule::default(),
            pickup: None,
            destination: None,
            latest: None,
        }
    }

    pub fn with_fare_schedule(mut self, fares: FareSchedule) -> Self {
        self.fares = fares;
        self
    }

    pub fn pickup(&self) -> Option<Coordinates> {
        self.pickup
    }

    pub fn destination(&self) -> Option<Zone> {
        self.destination
    }

    /// Latest successful route, cleared when an input change yields no route.
    pub fn latest(&self) -> Option<RouteUpdate> {
        self.latest
    }

    pub fn set_pickup(&mut self, pickup: Coordinates) -> Option<RouteUpdate> {
        self.pickup = Some(pickup);
        self.recompute()
    }

    pub fn select_destination(&mut self, zone: Zone) -> Option<RouteUpdate> {
        self.destination = Some(zone);
        self.recompute()
    }

    fn recompute(&mut self) -> Option<RouteUpdate> {
        let pickup = self.pickup?;
        let zone = self.destination?;
        let Some(target) = destination_for(zone).and_then(|entry| entry.coordinates()) else {
            self.latest = None;
            return None;
        };

        self.latest = self.provider.route(pickup, target).and_then(|summary| {
            let advisory_fare = self.fares.route_fare(summary.distance_km)?;
            Some(RouteUpdate {
                distance_km: summary.distance_km,
                duration_secs: summary.duration_secs,
                advisory_fare,
            })
        });
        if let Some(update) = self.latest {
            tracing::debug!(
                distance_km = update.distance_km,
                zone = %zone,
                "route recomputed"
            );
        }
        self.latest
    }
}
