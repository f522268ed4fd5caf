//! # Gemini Chat Client
//!
//! Chat completion against the Gemini REST API
//! (`POST /v1beta/models/{model}:generateContent`). The full accumulated
//! session history is sent as role-tagged contents on every call; the API
//! is stateless, so the session object (see `session`) is what makes the
//! conversation continuous.

use crate::dialogue::session::Turn;
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Generates the assistant's reply from a session history.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl ChatClient {
    /// Create a new client.
    ///
    /// ## Parameters:
    /// - **api_key**: The `GEMINI_API_KEY` value
    /// - **model**: Model identifier, e.g. "gemini-1.5-flash"
    /// - **timeout**: Per-request timeout for the generation call
    pub fn new(api_key: String, model: String, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API host (tests).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Generate a reply to the latest user turn in `history`.
    ///
    /// The whole history (persona seed included) is replayed; the reply
    /// is the concatenated text of the first candidate's parts.
    pub async fn generate(&self, history: &[Turn]) -> AppResult<String> {
        debug!(turns = history.len(), model = %self.model, "requesting chat completion");

        let request = GenerateRequest {
            contents: history
                .iter()
                .map(|turn| Content {
                    role: turn.role.as_str(),
                    parts: vec![Part { text: &turn.text }],
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Dialogue(format!("generate request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Dialogue(format!(
                "generate API error {}: {}",
                status, body
            )));
        }

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Dialogue(format!("generate parse error: {}", e)))?;

        let reply: String = result
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if reply.is_empty() {
            return Err(AppError::Dialogue(
                "model returned no candidates".to_string(),
            ));
        }

        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialogue::session::Role;

    fn test_client(server: &mockito::ServerGuard) -> ChatClient {
        ChatClient::new(
            "test-key".to_string(),
            "gemini-1.5-flash".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(server.url())
    }

    #[tokio::test]
    async fn sends_history_and_parses_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "What time do you close?"}]}
                ]
            })))
            .with_status(200)
            .with_body(
                r#"{"candidates": [{"content": {"role": "model",
                    "parts": [{"text": "We close at "}, {"text": "10:00 PM daily."}]}}]}"#,
            )
            .create_async()
            .await;

        let history = vec![Turn::new(Role::User, "What time do you close?")];
        let reply = test_client(&server).generate(&history).await.unwrap();
        assert_eq!(reply, "We close at 10:00 PM daily.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
            .with_status(200)
            .with_body(r#"{"candidates": []}"#)
            .create_async()
            .await;

        let history = vec![Turn::new(Role::User, "hello")];
        let err = test_client(&server).generate(&history).await.unwrap_err();
        assert!(matches!(err, AppError::Dialogue(_)));
    }

    #[tokio::test]
    async fn api_error_maps_to_dialogue_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-1.5-flash:generateContent")
            .with_status(429)
            .with_body(r#"{"error": {"message": "quota"}}"#)
            .create_async()
            .await;

        let history = vec![Turn::new(Role::User, "hello")];
        let err = test_client(&server).generate(&history).await.unwrap_err();
        assert!(matches!(err, AppError::Dialogue(_)));
    }
}
