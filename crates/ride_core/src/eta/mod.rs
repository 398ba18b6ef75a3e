//! Best-effort natural-language ETA estimates from an external AI backend.
//!
//! ```text
//! TripPlanner (pickup / destination / distance changed)
//!        |
//!        v
//! EtaDispatcher --begin--> EtaBoard (ticket n)      worker thread
//!        |                                              |
//!        '------------------ spawn -------------------> EtaClient::estimate
//!                                                       |  (one attempt, never fails)
//! EtaBoard::complete(ticket n, text) <---- channel -----'
//!        |
//!        '--> shown only if n is still the latest ticket
//! ```
//!
//! The estimate is opaque display text. Nothing downstream parses it, and fares and
//! matching never depend on it.

pub mod board;
pub mod dispatch;
pub mod prompt;

#[cfg(feature = "http")]
pub mod gemini;
#[cfg(feature = "http")]
pub mod http;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinates;

pub use board::{EtaBoard, EtaDisplay, EtaTicket};
pub use dispatch::EtaDispatcher;
#[cfg(feature = "http")]
pub use gemini::GeminiBackend;
#[cfg(feature = "http")]
pub use http::HttpEstimationBackend;

/// Text shown whenever an estimate cannot be produced.
pub const FALLBACK_ETA: &str = "ETA unavailable";

/// ETA service request body: `{ "distanceKm": .., "origin": .., "destination": .. }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EtaRequest {
    pub distance_km: f64,
    pub origin: String,
    pub destination: String,
}

impl EtaRequest {
    pub fn new(distance_km: f64, origin: Coordinates, destination: &str) -> Self {
        Self {
            distance_km,
            origin: origin.label(),
            destination: destination.to_string(),
        }
    }
}

/// ETA service success body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaResponse {
    pub eta: String,
}

/// ETA service failure body, sent with a non-2xx status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtaErrorBody {
    pub error: String,
}

#[derive(Debug, Error)]
pub enum EstimationError {
    #[error("estimation backend is not configured: {0}")]
    NotConfigured(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("backend returned status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed backend response: {0}")]
    Malformed(String),
    #[error("backend returned no estimate text")]
    Empty,
}

/// One attempt at an estimate. Implementations must not retry.
pub trait EstimationBackend: Send + Sync {
    fn estimate(&self, request: &EtaRequest) -> Result<String, EstimationError>;
}

impl<B: EstimationBackend + ?Sized> EstimationBackend for Box<B> {
    fn estimate(&self, request: &EtaRequest) -> Result<String, EstimationError> {
        (**self).estimate(request)
    }
}

impl<B: EstimationBackend + ?Sized> EstimationBackend for std::sync::Arc<B> {
    fn estimate(&self, request: &EtaRequest) -> Result<String, EstimationError> {
        (**self).estimate(request)
    }
}

/// Backend used when nothing is configured: every estimate fails.
#[derive(Debug, Clone, Default)]
pub struct UnconfiguredBackend;

impl EstimationBackend for UnconfiguredBackend {
    fn estimate(&self, _request: &EtaRequest) -> Result<String, EstimationError> {
        Err(EstimationError::NotConfigured(
            "set GEMINI_API_KEY or ETA_ENDPOINT".to_string(),
        ))
    }
}

/// Wraps a backend so callers always get display text back.
#[derive(Debug, Clone)]
pub struct EtaClient<B> {
    backend: B,
}

impl<B: EstimationBackend> EtaClient<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Estimate travel time and traffic for a trip. Returns [`FALLBACK_ETA`] on any failure.
    pub fn estimate(&self, distance_km: f64, origin: Coordinates, destination: &str) -> String {
        self.estimate_request(&EtaRequest::new(distance_km, origin, destination))
    }

    pub fn estimate_request(&self, request: &EtaRequest) -> String {
        match self.backend.estimate(request) {
            Ok(text) if !text.trim().is_empty() => text.trim().to_string(),
            Ok(_) => {
                tracing::warn!(
                    destination = %request.destination,
                    error = %EstimationError::Empty,
                    "eta_estimate_failed"
                );
                FALLBACK_ETA.to_string()
            }
            Err(error) => {
                tracing::warn!(
                    destination = %request.destination,
                    %error,
                    "eta_estimate_failed"
                );
                FALLBACK_ETA.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(Result<&'static str, u16>);

    impl EstimationBackend for Canned {
        fn estimate(&self, _request: &EtaRequest) -> Result<String, EstimationError> {
            self.0
                .map(str::to_string)
                .map_err(|status| EstimationError::Status {
                    status,
                    message: "AI failed".to_string(),
                })
        }
    }

    fn origin() -> Coordinates {
        Coordinates::new(14.83, 120.28).unwrap()
    }

    #[test]
    fn request_body_uses_wire_names() {
        let body = serde_json::to_value(EtaRequest::new(2.0, origin(), "Gordon College ANNEX Campus"))
            .unwrap();
        assert_eq!(body["distanceKm"], 2.0);
        assert_eq!(body["origin"], "14.83, 120.28");
        assert_eq!(body["destination"], "Gordon College ANNEX Campus");
    }

    #[test]
    fn success_text_is_passed_through_trimmed() {
        let client = EtaClient::new(Canned(Ok("  ~6 min, light traffic\n")));
        assert_eq!(
            client.estimate(2.0, origin(), "Gordon College ANNEX Campus"),
            "~6 min, light traffic"
        );
    }

    #[test]
    fn failures_and_blank_text_become_fallback() {
        let failing = EtaClient::new(Canned(Err(500)));
        assert_eq!(failing.estimate(2.0, origin(), "x"), FALLBACK_ETA);

        let blank = EtaClient::new(Canned(Ok("   ")));
        assert_eq!(blank.estimate(2.0, origin(), "x"), FALLBACK_ETA);

        let unconfigured = EtaClient::new(UnconfiguredBackend);
        assert_eq!(unconfigured.estimate(2.0, origin(), "x"), FALLBACK_ETA);
    }
}
