use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use super::prompt::build_prompt;
use super::{EstimationBackend, EstimationError, EtaRequest};

pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Asks a Gemini model directly via the `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Result<Self, EstimationError> {
        if api_key.trim().is_empty() {
            return Err(EstimationError::NotConfigured(
                "GEMINI_API_KEY is empty".to_string(),
            ));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| EstimationError::Transport(error.to_string()))?;
        Ok(Self {
            client,
            api_base: GEMINI_API_BASE.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        )
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Concatenated text parts of the first candidate.
fn extract_text(response: GenerateContentResponse) -> Result<String, EstimationError> {
    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or(EstimationError::Empty)?;
    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(EstimationError::Empty);
    }
    Ok(text)
}

impl EstimationBackend for GeminiBackend {
    fn estimate(&self, request: &EtaRequest) -> Result<String, EstimationError> {
        let prompt = build_prompt(request);
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [RequestPart { text: &prompt }],
            }],
        };
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|error| EstimationError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(EstimationError::Status {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .map_err(|error| EstimationError::Malformed(error.to_string()))?;
        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(
            GeminiBackend::new("  ", "gemini-2.0-flash", Duration::from_secs(1)),
            Err(EstimationError::NotConfigured(_))
        ));
    }

    #[test]
    fn url_targets_configured_model() {
        let backend = GeminiBackend::new("key", "gemini-2.0-flash", Duration::from_secs(1))
            .unwrap()
            .with_api_base("http://localhost:8080/");
        assert_eq!(
            backend.url(),
            "http://localhost:8080/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn request_body_wraps_prompt() {
        let body = GenerateContentRequest {
            contents: [Content {
                parts: [RequestPart { text: "hi" }],
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
    }

    #[test]
    fn extracts_text_from_first_candidate() {
        let parsed: GenerateContentResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"~6 min. "},{"text":"Traffic: light"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(parsed).unwrap(), "~6 min. Traffic: light");
    }

    #[test]
    fn missing_candidates_or_text_is_empty() {
        let none: GenerateContentResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(extract_text(none), Err(EstimationError::Empty)));

        let blocked: GenerateContentResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert!(matches!(extract_text(blocked), Err(EstimationError::Empty)));
    }
}
