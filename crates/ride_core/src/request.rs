//! Ride request records and their lifecycle status.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::geo::Coordinates;
use crate::pricing::Fare;
use crate::zones::Zone;

/// Time-derived, strictly increasing request identifier (milliseconds since epoch or later).
pub type RequestId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RideKind {
    /// Zone-priced pickup on or around campus.
    Pickup,
    /// Map-routed trip from a pinned location to a named destination.
    DestinationTrip,
    /// Parcel delivery ("pahatid").
    Parcel,
}

impl RideKind {
    pub fn requires_pickup_coordinates(self) -> bool {
        matches!(self, RideKind::DestinationTrip)
    }

    pub fn label(self) -> &'static str {
        match self {
            RideKind::Pickup => "pickup",
            RideKind::DestinationTrip => "destination-trip",
            RideKind::Parcel => "parcel",
        }
    }

    /// Default simulated matching latency for this kind.
    pub fn default_match_delay(self) -> Duration {
        match self {
            RideKind::Pickup => Duration::from_millis(2_000),
            RideKind::Parcel => Duration::from_millis(2_500),
            RideKind::DestinationTrip => Duration::from_millis(3_000),
        }
    }
}

impl fmt::Display for RideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Matched,
    Cancelled,
    /// Reserved terminal state; nothing produces it yet.
    Expired,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Status only moves forward, out of `Pending`, exactly once.
    pub fn can_transition_to(self, next: RequestStatus) -> bool {
        self == RequestStatus::Pending && next.is_terminal()
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Matched => "matched",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Expired => "expired",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request {id}: cannot move from {from} to {to}")]
pub struct TransitionError {
    pub id: RequestId,
    pub from: RequestStatus,
    pub to: RequestStatus,
}

/// Where the rider is headed: a campus zone key or a resolved destination name.
///
/// Serialized as a plain string; zone keys round-trip back to `Zone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationDescriptor {
    Zone(Zone),
    Named(String),
}

impl DestinationDescriptor {
    pub fn as_str(&self) -> &str {
        match self {
            DestinationDescriptor::Zone(zone) => zone.key(),
            DestinationDescriptor::Named(name) => name,
        }
    }
}

impl fmt::Display for DestinationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DestinationDescriptor {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DestinationDescriptor {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(de)?;
        Ok(match raw.parse::<Zone>() {
            Ok(zone) if zone.key() == raw => DestinationDescriptor::Zone(zone),
            _ => DestinationDescriptor::Named(raw),
        })
    }
}

/// A persisted ride request.
///
/// Everything except `status` is fixed at construction. `status` changes only through
/// [`RideRequest::transition`], which enforces forward-only moves out of `Pending`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideRequest {
    id: RequestId,
    kind: RideKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pickup_coordinates: Option<Coordinates>,
    destination_descriptor: DestinationDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    fare: Fare,
    status: RequestStatus,
    created_at: DateTime<Utc>,
}

impl RideRequest {
    /// Build a new `Pending` request.
    pub fn new(
        id: RequestId,
        kind: RideKind,
        pickup_coordinates: Option<Coordinates>,
        destination_descriptor: DestinationDescriptor,
        description: Option<String>,
        fare: Fare,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            pickup_coordinates,
            destination_descriptor,
            description,
            fare,
            status: RequestStatus::Pending,
            created_at,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn kind(&self) -> RideKind {
        self.kind
    }

    pub fn pickup_coordinates(&self) -> Option<Coordinates> {
        self.pickup_coordinates
    }

    pub fn destination_descriptor(&self) -> &DestinationDescriptor {
        &self.destination_descriptor
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn fare(&self) -> Fare {
        self.fare
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn transition(&mut self, next: RequestStatus) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(next) {
            return Err(TransitionError {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// User inputs gathered before a submit action.
#[derive(Debug, Clone, PartialEq)]
pub struct RideDraft {
    pub kind: RideKind,
    pub pickup: Option<Coordinates>,
    pub destination: Option<Zone>,
    pub description: Option<String>,
    /// Route distance from the routing provider, when a route exists.
    pub route_distance_km: Option<f64>,
}

impl RideDraft {
    pub fn new(kind: RideKind) -> Self {
        Self {
            kind,
            pickup: None,
            destination: None,
            description: None,
            route_distance_km: None,
        }
    }

    pub fn with_pickup(mut self, pickup: Coordinates) -> Self {
        self.pickup = Some(pickup);
        self
    }

    pub fn with_destination(mut self, zone: Zone) -> Self {
        self.destination = Some(zone);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_route_distance_km(mut self, distance_km: f64) -> Self {
        self.route_distance_km = Some(distance_km);
        self
    }
}
