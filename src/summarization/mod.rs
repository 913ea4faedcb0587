//! Generation collaborator used by the summarization pipeline.
//!
//! The pipeline only needs "prompt in, text out". [`GenerationClient`] captures that seam and
//! [`GeminiClient`] implements it against the Gemini `generateContent` REST endpoint. The client
//! is only built when a credential is configured; the orchestrator treats its absence as a
//! configuration error.

use crate::config::Config;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced while generating text.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider could not be reached or the HTTP client could not be built.
    #[error("Generation provider unavailable: {0}")]
    Unavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate content: {0}")]
    Failed(String),
    /// Provider response could not be parsed or carried no text.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
    /// Provider did not answer within the configured bound.
    #[error("Generation timed out after {0:?}")]
    TimedOut(Duration),
}

/// Interface implemented by text generation providers.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Generate a completion for a single prompt.
    async fn generate(&self, prompt: String) -> Result<String, GenerationError>;
}

/// Build the generation client for the current configuration.
///
/// Returns `Ok(None)` when no Gemini credential is configured.
pub fn build_generation_client(
    config: &Config,
) -> Result<Option<Arc<dyn GenerationClient>>, GenerationError> {
    let Some(api_key) = config.gemini_api_key.clone() else {
        return Ok(None);
    };
    let client = GeminiClient::new(
        config.gemini_api_base.clone(),
        config.gemini_model.clone(),
        api_key,
    )?;
    Ok(Some(Arc::new(client)))
}

/// Gemini REST client.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Construct a client for `model` at `base_url`.
    pub fn new(base_url: String, model: String, api_key: String) -> Result<Self, GenerationError> {
        let http = Client::builder()
            .user_agent("docscan/summary")
            .build()
            .map_err(|error| {
                GenerationError::Unavailable(format!("failed to build HTTP client: {error}"))
            })?;
        Ok(Self {
            http,
            base_url,
            model,
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String, GenerationError> {
        if let Some(reason) = self
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(GenerationError::InvalidResponse(format!(
                "prompt blocked by provider: {reason}"
            )));
        }

        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(
                "no text in Gemini response".into(),
            ));
        }
        Ok(text)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate(&self, prompt: String) -> Result<String, GenerationError> {
        let payload = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                GenerationError::Unavailable(format!(
                    "failed to reach Gemini at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(GenerationError::Unavailable(format!(
                "Gemini model endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Failed(format!(
                "Gemini returned {status}: {body}"
            )));
        }

        let body: GenerateResponse = response.json().await.map_err(|error| {
            GenerationError::InvalidResponse(format!("failed to decode Gemini response: {error}"))
        })?;

        body.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    const ENDPOINT: &str = "/v1beta/models/gemini-test:generateContent";

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new(server.base_url(), "gemini-test".into(), "test-key".into())
            .expect("client")
    }

    #[tokio::test]
    async fn gemini_client_handles_successful_response() {
        let server = MockServer::start_async().await;
        let client = client_for(&server);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(ENDPOINT)
                    .header("x-goog-api-key", "test-key")
                    .body_contains("Summarize the following text");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": {
                            "role": "model",
                            "parts": [{ "text": "First half. " }, { "text": "Second half." }]
                        }
                    }]
                }));
            })
            .await;

        let text = client
            .generate("Summarize the following text in 2-3 sentences:\n\nBody".into())
            .await
            .expect("generated text");

        mock.assert_async().await;
        assert_eq!(text, "First half. Second half.");
    }

    #[tokio::test]
    async fn gemini_client_handles_error_status() {
        let server = MockServer::start_async().await;
        let client = client_for(&server);

        server
            .mock_async(|when, then| {
                when.method(POST).path(ENDPOINT);
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate("prompt".into())
            .await
            .expect_err("error response");

        assert!(
            matches!(error, GenerationError::Failed(ref message) if message.contains("500") && message.contains("boom"))
        );
    }

    #[tokio::test]
    async fn gemini_client_rejects_empty_candidates() {
        let server = MockServer::start_async().await;
        let client = client_for(&server);

        server
            .mock_async(|when, then| {
                when.method(POST).path(ENDPOINT);
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        let error = client.generate("prompt".into()).await.expect_err("no text");
        assert!(matches!(error, GenerationError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn gemini_client_reports_blocked_prompt() {
        let server = MockServer::start_async().await;
        let client = client_for(&server);

        server
            .mock_async(|when, then| {
                when.method(POST).path(ENDPOINT);
                then.status(200).json_body(json!({
                    "promptFeedback": { "blockReason": "SAFETY" }
                }));
            })
            .await;

        let error = client.generate("prompt".into()).await.expect_err("blocked");
        assert!(
            matches!(error, GenerationError::InvalidResponse(ref message) if message.contains("SAFETY"))
        );
    }

    #[tokio::test]
    async fn unreachable_provider_is_unavailable() {
        let client = GeminiClient::new(
            "http://127.0.0.1:9".into(),
            "gemini-test".into(),
            "test-key".into(),
        )
        .expect("client");
        let error = client.generate("prompt".into()).await.expect_err("unreachable");
        assert!(matches!(error, GenerationError::Unavailable(_)));
    }

    #[test]
    fn no_client_without_credential() {
        let config = Config::from_lookup(|_| None).expect("config");
        let client = build_generation_client(&config).expect("build");
        assert!(client.is_none());
    }

    #[test]
    fn client_is_built_with_credential() {
        let config = Config::from_lookup(|key| {
            (key == "GEMINI_API_KEY").then(|| "secret".to_string())
        })
        .expect("config");
        let client = build_generation_client(&config).expect("build");
        assert!(client.is_some());
    }
}
