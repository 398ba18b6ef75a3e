//! Environment-driven configuration.
//!
//! Settings are read through a lookup function, so callers decide whether values come
//! from the process environment, command-line flags layered over it, or a test table.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::eta::{EstimationBackend, UnconfiguredBackend};

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_QUEUE_FILE: &str = "all_requests_queue.json";
pub const DEFAULT_ETA_TIMEOUT: Duration = Duration::from_millis(10_000);

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const GEMINI_MODEL_VAR: &str = "GEMINI_MODEL";
pub const ETA_ENDPOINT_VAR: &str = "ETA_ENDPOINT";
pub const ETA_TIMEOUT_MS_VAR: &str = "ETA_TIMEOUT_MS";
pub const QUEUE_PATH_VAR: &str = "RIDE_QUEUE_PATH";
pub const OSRM_ENDPOINT_VAR: &str = "OSRM_ENDPOINT";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be a positive number of milliseconds, got '{value}'")]
    InvalidTimeout { var: &'static str, value: String },
    #[error("failed to build estimation backend: {0}")]
    Backend(String),
}

/// Which service answers ETA questions, and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for EstimationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            endpoint: None,
            timeout: DEFAULT_ETA_TIMEOUT,
        }
    }
}

impl EstimationConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let timeout = match non_empty(ETA_TIMEOUT_MS_VAR) {
            Some(raw) => parse_timeout(ETA_TIMEOUT_MS_VAR, &raw)?,
            None => DEFAULT_ETA_TIMEOUT,
        };

        Ok(Self {
            api_key: non_empty(GEMINI_API_KEY_VAR),
            model: non_empty(GEMINI_MODEL_VAR).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            endpoint: non_empty(ETA_ENDPOINT_VAR),
            timeout,
        })
    }

    /// Backend for this configuration: the ETA endpoint if set, else Gemini if a key is
    /// present, else a backend that always fails.
    pub fn backend(&self) -> Result<Box<dyn EstimationBackend>, ConfigError> {
        if let Some(endpoint) = &self.endpoint {
            tracing::debug!(%endpoint, "using http eta backend");
            return http_backend(endpoint, self.timeout);
        }
        if let Some(api_key) = &self.api_key {
            tracing::debug!(model = %self.model, "using gemini eta backend");
            return gemini_backend(api_key, &self.model, self.timeout);
        }
        Ok(Box::new(UnconfiguredBackend))
    }
}

#[cfg(feature = "http")]
fn http_backend(endpoint: &str, timeout: Duration) -> Result<Box<dyn EstimationBackend>, ConfigError> {
    let backend = crate::eta::HttpEstimationBackend::new(endpoint, timeout)
        .map_err(|error| ConfigError::Backend(error.to_string()))?;
    Ok(Box::new(backend))
}

#[cfg(feature = "http")]
fn gemini_backend(
    api_key: &str,
    model: &str,
    timeout: Duration,
) -> Result<Box<dyn EstimationBackend>, ConfigError> {
    let backend = crate::eta::GeminiBackend::new(api_key, model, timeout)
        .map_err(|error| ConfigError::Backend(error.to_string()))?;
    Ok(Box::new(backend))
}

#[cfg(not(feature = "http"))]
fn http_backend(_endpoint: &str, _timeout: Duration) -> Result<Box<dyn EstimationBackend>, ConfigError> {
    tracing::warn!("eta endpoint ignored: built without the http feature");
    Ok(Box::new(UnconfiguredBackend))
}

#[cfg(not(feature = "http"))]
fn gemini_backend(
    _api_key: &str,
    _model: &str,
    _timeout: Duration,
) -> Result<Box<dyn EstimationBackend>, ConfigError> {
    tracing::warn!("gemini key ignored: built without the http feature");
    Ok(Box::new(UnconfiguredBackend))
}

fn parse_timeout(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(millis) if millis > 0 => Ok(Duration::from_millis(millis)),
        _ => Err(ConfigError::InvalidTimeout {
            var,
            value: raw.to_string(),
        }),
    }
}

/// Everything a ride session needs from its environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RideConfig {
    pub queue_path: PathBuf,
    pub osrm_endpoint: Option<String>,
    pub estimation: EstimationConfig,
}

impl Default for RideConfig {
    fn default() -> Self {
        Self {
            queue_path: PathBuf::from(DEFAULT_QUEUE_FILE),
            osrm_endpoint: None,
            estimation: EstimationConfig::default(),
        }
    }
}

impl RideConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        Ok(Self {
            queue_path: non_empty(QUEUE_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_QUEUE_FILE)),
            osrm_endpoint: non_empty(OSRM_ENDPOINT_VAR),
            estimation: EstimationConfig::from_lookup(&lookup)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = RideConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RideConfig::default());
    }

    #[test]
    fn reads_all_settings() {
        let config = RideConfig::from_lookup(lookup(&[
            ("RIDE_QUEUE_PATH", "/tmp/queue.json"),
            ("OSRM_ENDPOINT", "http://localhost:5000"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-1.5-pro"),
            ("ETA_TIMEOUT_MS", "2500"),
        ]))
        .unwrap();
        assert_eq!(config.queue_path, PathBuf::from("/tmp/queue.json"));
        assert_eq!(config.osrm_endpoint.as_deref(), Some("http://localhost:5000"));
        assert_eq!(config.estimation.api_key.as_deref(), Some("secret"));
        assert_eq!(config.estimation.model, "gemini-1.5-pro");
        assert_eq!(config.estimation.timeout, Duration::from_millis(2500));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config =
            EstimationConfig::from_lookup(lookup(&[("GEMINI_API_KEY", "  "), ("GEMINI_MODEL", "")]))
                .unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.model, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn rejects_bad_timeout() {
        for raw in ["0", "soon", "-5"] {
            let err = EstimationConfig::from_lookup(lookup(&[("ETA_TIMEOUT_MS", raw)])).unwrap_err();
            assert_eq!(
                err,
                ConfigError::InvalidTimeout {
                    var: ETA_TIMEOUT_MS_VAR,
                    value: raw.to_string(),
                }
            );
        }
    }

    #[test]
    fn unconfigured_backend_always_fails() {
        let backend = EstimationConfig::default().backend().unwrap();
        let request = crate::eta::EtaRequest {
            distance_km: 1.0,
            origin: "14.83, 120.28".to_string(),
            destination: "Gordon College Main Campus".to_string(),
        };
        assert!(backend.estimate(&request).is_err());
    }
}
