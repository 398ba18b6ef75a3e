//! Ride request lifecycle: validate, price, persist, then simulate matching.
//!
//! ```text
//! Idle --submit--> (validate) --enqueue--> Submitted(timer armed)
//!                                             |-- timer fires --> Matched   --> Idle
//!                                             '-- cancel(token) --> Cancelled --> Idle
//! ```
//!
//! The controller is single-threaded: every transition happens inside a `&mut self` call.
//! `poll` fires due timers, `cancel` removes one. Both take the in-flight slot with
//! `Option::take`, so for a given [`MatchToken`] exactly one of them observes the request
//! and the other finds nothing left to do.

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::clock::{Clock, MatchTimers, MatchToken, SystemClock};
use crate::pricing::{FareQuote, FareSchedule};
use crate::request::{
    DestinationDescriptor, RequestId, RequestStatus, RideDraft, RideKind, RideRequest,
};
use crate::store::{RequestRecordStore, StatusTransition, StoreError};
use crate::zones::{destination_for, destination_named, Zone};

/// Simulated matching latency per request kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDelays {
    pub pickup: Duration,
    pub destination_trip: Duration,
    pub parcel: Duration,
}

impl Default for MatchDelays {
    fn default() -> Self {
        Self {
            pickup: RideKind::Pickup.default_match_delay(),
            destination_trip: RideKind::DestinationTrip.default_match_delay(),
            parcel: RideKind::Parcel.default_match_delay(),
        }
    }
}

impl MatchDelays {
    pub fn for_kind(&self, kind: RideKind) -> Duration {
        match kind {
            RideKind::Pickup => self.pickup,
            RideKind::DestinationTrip => self.destination_trip,
            RideKind::Parcel => self.parcel,
        }
    }
}

/// Submission blocked by missing or unusable input. Messages are user-facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Click on the map to set your current location first.")]
    MissingPickup,
    #[error("Select a destination first.")]
    MissingDestination,
    #[error("No route destination is available for zone '{0}'.")]
    UnknownDestination(Zone),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("ride request {0} is still waiting for a rider")]
    AlreadyInFlight(RequestId),
    #[error("failed to persist ride request: {0}")]
    Persistence(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Submitted { request_id: RequestId },
}

/// Result of a successful submit.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub request: RideRequest,
    pub quote: FareQuote,
    pub token: MatchToken,
    pub match_deadline: DateTime<Utc>,
}

/// Terminal transition of the in-flight request.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    Matched(RideRequest),
    Cancelled(RideRequest),
}

impl LifecycleEvent {
    pub fn request(&self) -> &RideRequest {
        match self {
            LifecycleEvent::Matched(request) | LifecycleEvent::Cancelled(request) => request,
        }
    }

    /// Notification text shown to the rider.
    pub fn notice(&self) -> String {
        match self {
            LifecycleEvent::Cancelled(_) => "Request cancelled.".to_string(),
            LifecycleEvent::Matched(request) => match request.kind() {
                RideKind::Pickup => "Request queued — rider will be assigned shortly.".to_string(),
                RideKind::Parcel => "Rider is on its way!".to_string(),
                RideKind::DestinationTrip => format!(
                    "Rider found! Your request to {} has been queued.",
                    request.destination_descriptor()
                ),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CancelOutcome {
    Cancelled(RideRequest),
    /// The token's request already matched, was already cancelled, or never existed.
    NothingToCancel,
}

#[derive(Debug)]
struct InFlight {
    token: MatchToken,
    request: RideRequest,
}

/// Drives one client session's ride requests. At most one request is in flight.
pub struct RequestLifecycleController<S, C = SystemClock> {
    store: S,
    clock: C,
    fares: FareSchedule,
    delays: MatchDelays,
    timers: MatchTimers,
    in_flight: Option<InFlight>,
    last_issued_id: Option<RequestId>,
    history: Vec<RideRequest>,
}

impl<S: RequestRecordStore, C: Clock> RequestLifecycleController<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            fares: FareSchedule::default(),
            delays: MatchDelays::default(),
            timers: MatchTimers::default(),
            in_flight: None,
            last_issued_id: None,
            history: Vec::new(),
        }
    }

    pub fn with_fare_schedule(mut self, fares: FareSchedule) -> Self {
        self.fares = fares;
        self
    }

    pub fn with_match_delays(mut self, delays: MatchDelays) -> Self {
        self.delays = delays;
        self
    }

    pub fn phase(&self) -> LifecyclePhase {
        match &self.in_flight {
            Some(flight) => LifecyclePhase::Submitted {
                request_id: flight.request.id(),
            },
            None => LifecyclePhase::Idle,
        }
    }

    pub fn in_flight(&self) -> Option<&RideRequest> {
        self.in_flight.as_ref().map(|flight| &flight.request)
    }

    /// Requests submitted through this controller, with their in-memory status.
    pub fn history(&self) -> &[RideRequest] {
        &self.history
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// When the in-flight request's matching timer is due, if one is armed.
    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.timers.next_deadline()
    }

    /// Fare the draft would be charged if submitted now.
    pub fn quote(&self, draft: &RideDraft) -> Result<FareQuote, ValidationError> {
        let (zone, _) = validate(draft)?;
        Ok(self.fares.quote(draft.route_distance_km, zone))
    }

    /// Validate, price, persist and arm the matching timer.
    ///
    /// On any error nothing is persisted and no timer is armed.
    pub fn submit(&mut self, draft: &RideDraft) -> Result<Submission, SubmitError> {
        if let Some(flight) = &self.in_flight {
            tracing::info!(
                in_flight = flight.request.id(),
                "ride_request_rejected: another request is in flight"
            );
            return Err(SubmitError::AlreadyInFlight(flight.request.id()));
        }

        let (zone, destination) = validate(draft).map_err(|error| {
            tracing::info!(kind = %draft.kind, %error, "ride_request_rejected");
            error
        })?;
        let quote = self.fares.quote(draft.route_distance_km, zone);

        let now = self.clock.now();
        let id = self.next_id(now)?;
        let description = draft
            .description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string);
        let request = RideRequest::new(
            id,
            draft.kind,
            draft.pickup,
            destination,
            description,
            quote.fare,
            now,
        );

        self.store.enqueue(&request).map_err(|error| {
            tracing::error!(request_id = id, %error, "ride_request_not_persisted");
            error
        })?;
        self.last_issued_id = Some(id);

        let delay = self.delays.for_kind(draft.kind);
        let match_deadline = now
            + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
        let token = self.timers.schedule(id, match_deadline);
        self.history.push(request.clone());
        self.in_flight = Some(InFlight {
            token,
            request: request.clone(),
        });

        tracing::info!(
            request_id = id,
            kind = %draft.kind,
            destination = %request.destination_descriptor(),
            fare = %quote.fare,
            delay_ms = delay.as_millis() as u64,
            "ride_request_submitted"
        );

        Ok(Submission {
            request,
            quote,
            token,
            match_deadline,
        })
    }

    /// Fire every matching timer that is due at the clock's current time.
    pub fn poll(&mut self) -> Vec<LifecycleEvent> {
        let now = self.clock.now();
        let mut events = Vec::new();
        while let Some(token) = self.timers.pop_due(now) {
            match self.in_flight.take() {
                Some(flight) if flight.token == token => {
                    let request = self.settle(flight.request, RequestStatus::Matched);
                    tracing::info!(request_id = request.id(), "ride_request_matched");
                    events.push(LifecycleEvent::Matched(request));
                }
                other => {
                    self.in_flight = other;
                    tracing::debug!(
                        request_id = token.request_id(),
                        "stale_match_timer_ignored"
                    );
                }
            }
        }
        events
    }

    /// Cancel the request armed under `token`. A no-op once it matched or was cancelled.
    pub fn cancel(&mut self, token: MatchToken) -> CancelOutcome {
        match self.in_flight.take() {
            Some(flight) if flight.token == token => {
                self.timers.cancel(token);
                let request = self.settle(flight.request, RequestStatus::Cancelled);
                tracing::info!(request_id = request.id(), "ride_request_cancelled");
                CancelOutcome::Cancelled(request)
            }
            other => {
                self.in_flight = other;
                tracing::debug!(
                    request_id = token.request_id(),
                    "cancel ignored: nothing in flight for token"
                );
                CancelOutcome::NothingToCancel
            }
        }
    }

    /// Cancel whatever is in flight.
    pub fn cancel_in_flight(&mut self) -> CancelOutcome {
        match self.in_flight.as_ref().map(|flight| flight.token) {
            Some(token) => self.cancel(token),
            None => CancelOutcome::NothingToCancel,
        }
    }

    /// `max(now_ms, last + 1)` over the store's last id and the last id issued here.
    fn next_id(&self, now: DateTime<Utc>) -> Result<RequestId, StoreError> {
        let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or(0);
        let last = self.store.last_id()?.max(self.last_issued_id);
        Ok(match last {
            Some(last) => now_ms.max(last + 1),
            None => now_ms,
        })
    }

    fn settle(&mut self, mut request: RideRequest, status: RequestStatus) -> RideRequest {
        if let Err(error) = request.transition(status) {
            tracing::error!(%error, "in-flight request was not pending");
            return request;
        }

        let transition = StatusTransition {
            request_id: request.id(),
            status,
            at: self.clock.now(),
        };
        if let Err(error) = self.store.record_transition(&transition) {
            tracing::error!(
                request_id = request.id(),
                %status,
                %error,
                "status_transition_not_persisted"
            );
        }

        if let Some(entry) = self
            .history
            .iter_mut()
            .find(|entry| entry.id() == request.id())
        {
            *entry = request.clone();
        }
        request
    }
}

/// Check the submit guards and resolve the pricing zone and destination descriptor.
fn validate(draft: &RideDraft) -> Result<(Zone, DestinationDescriptor), ValidationError> {
    if draft.kind.requires_pickup_coordinates() && draft.pickup.is_none() {
        return Err(ValidationError::MissingPickup);
    }
    let zone = draft.destination.ok_or(ValidationError::MissingDestination)?;

    let descriptor = match draft.kind {
        RideKind::DestinationTrip => {
            let destination =
                destination_for(zone).ok_or(ValidationError::UnknownDestination(zone))?;
            DestinationDescriptor::Named(destination.name.to_string())
        }
        RideKind::Pickup | RideKind::Parcel => DestinationDescriptor::Zone(zone),
    };
    Ok((zone, descriptor))
}

/// Pricing zone recorded for a stored request, if its descriptor resolves to one.
pub fn zone_of(request: &RideRequest) -> Option<Zone> {
    match request.destination_descriptor() {
        DestinationDescriptor::Zone(zone) => Some(*zone),
        DestinationDescriptor::Named(name) => destination_named(name).map(|entry| entry.zone),
    }
}
