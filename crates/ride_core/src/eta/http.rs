use std::time::Duration;

use reqwest::blocking::Client;

use super::{EstimationBackend, EstimationError, EtaErrorBody, EtaRequest, EtaResponse};

/// Client for an HTTP ETA service: POST `{distanceKm, origin, destination}`,
/// 2xx `{eta}` on success, non-2xx `{error}` on failure.
#[derive(Debug, Clone)]
pub struct HttpEstimationBackend {
    client: Client,
    endpoint: String,
}

impl HttpEstimationBackend {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, EstimationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| EstimationError::Transport(error.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl EstimationBackend for HttpEstimationBackend {
    fn estimate(&self, request: &EtaRequest) -> Result<String, EstimationError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|error| EstimationError::Transport(error.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|error| EstimationError::Transport(error.to_string()))?;
        interpret_response(status, &body)
    }
}

/// Map a raw ETA service response to estimate text or an error.
pub(crate) fn interpret_response(status: u16, body: &str) -> Result<String, EstimationError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<EtaErrorBody>(body)
            .map(|parsed| parsed.error)
            .unwrap_or_else(|_| body.chars().take(200).collect());
        return Err(EstimationError::Status { status, message });
    }

    let parsed: EtaResponse = serde_json::from_str(body)
        .map_err(|error| EstimationError::Malformed(error.to_string()))?;
    if parsed.eta.trim().is_empty() {
        return Err(EstimationError::Empty);
    }
    Ok(parsed.eta)
}
