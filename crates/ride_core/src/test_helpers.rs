//! Test helpers for common test setup and utilities.
//!
//! Shared fixtures for unit tests, integration tests and benches: a fixed start instant,
//! sample coordinates near the campuses, scripted estimation backends and a store that
//! fails on demand.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use crate::clock::ManualClock;
use crate::eta::{EstimationBackend, EstimationError, EtaRequest};
use crate::geo::Coordinates;
use crate::request::{RequestId, RideRequest};
use crate::store::{MemoryRecordStore, RequestRecordStore, StatusTransition, StoreError};

/// Fixed start instant shared by deterministic tests.
///
/// # Panics
///
/// Panics if the constant date is invalid (should never happen).
pub fn test_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 7, 30, 0)
        .single()
        .expect("fixed test instant should be valid")
}

/// A manual clock starting at [`test_start`].
pub fn test_clock() -> ManualClock {
    ManualClock::at(test_start())
}

/// A pickup point a couple of kilometres from both campuses.
///
/// # Panics
///
/// Panics if the constant coordinates are invalid (should never happen).
pub fn test_pickup() -> Coordinates {
    Coordinates::new(14.83, 120.28).expect("test pickup should be valid")
}

/// Backend that always answers with the same text.
#[derive(Debug, Clone)]
pub struct FixedEstimate(pub String);

impl FixedEstimate {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }
}

impl EstimationBackend for FixedEstimate {
    fn estimate(&self, _request: &EtaRequest) -> Result<String, EstimationError> {
        Ok(self.0.clone())
    }
}

/// Backend that always fails the way an unreachable AI service would.
#[derive(Debug, Clone, Default)]
pub struct FailingEstimate;

impl EstimationBackend for FailingEstimate {
    fn estimate(&self, _request: &EtaRequest) -> Result<String, EstimationError> {
        Err(EstimationError::Status {
            status: 500,
            message: "AI failed".to_string(),
        })
    }
}

/// Backend whose answer and latency depend on the destination, for racing estimates.
#[derive(Debug, Default)]
pub struct ScriptedEstimate {
    script: Vec<(String, Duration, String)>,
    calls: Mutex<Vec<EtaRequest>>,
}

impl ScriptedEstimate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `text` after `delay` for requests to `destination`.
    pub fn on(mut self, destination: &str, delay: Duration, text: &str) -> Self {
        self.script
            .push((destination.to_string(), delay, text.to_string()));
        self
    }

    /// Requests received so far, in arrival order.
    ///
    /// # Panics
    ///
    /// Panics if a worker panicked while holding the call log.
    pub fn calls(&self) -> Vec<EtaRequest> {
        self.calls.lock().expect("call log poisoned").clone()
    }
}

impl EstimationBackend for ScriptedEstimate {
    fn estimate(&self, request: &EtaRequest) -> Result<String, EstimationError> {
        self.calls
            .lock()
            .expect("call log poisoned")
            .push(request.clone());
        let Some((_, delay, text)) = self
            .script
            .iter()
            .find(|(destination, _, _)| *destination == request.destination)
        else {
            return Err(EstimationError::Empty);
        };
        std::thread::sleep(*delay);
        Ok(text.clone())
    }
}

/// Memory store with injectable enqueue and status-write failures.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryRecordStore,
    fail_enqueue: VecDeque<bool>,
    fail_transitions: bool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next enqueue, then behave normally.
    pub fn fail_next_enqueue(mut self) -> Self {
        self.fail_enqueue.push_back(true);
        self
    }

    pub fn failing_transitions(mut self) -> Self {
        self.fail_transitions = true;
        self
    }

    pub fn inner(&self) -> &MemoryRecordStore {
        &self.inner
    }
}

impl RequestRecordStore for FlakyStore {
    fn enqueue(&mut self, record: &RideRequest) -> Result<(), StoreError> {
        if self.fail_enqueue.pop_front().unwrap_or(false) {
            return Err(StoreError::Unavailable("injected enqueue failure".to_string()));
        }
        self.inner.enqueue(record)
    }

    fn load_all(&self) -> Result<Vec<RideRequest>, StoreError> {
        self.inner.load_all()
    }

    fn record_transition(&mut self, transition: &StatusTransition) -> Result<(), StoreError> {
        if self.fail_transitions {
            return Err(StoreError::Unavailable(
                "injected transition failure".to_string(),
            ));
        }
        self.inner.record_transition(transition)
    }

    fn load_transitions(&self) -> Result<Vec<StatusTransition>, StoreError> {
        self.inner.load_transitions()
    }

    fn last_id(&self) -> Result<Option<RequestId>, StoreError> {
        self.inner.last_id()
    }
}
