//! # Speech-to-Text Client
//!
//! Batch recognition against the Google Cloud Speech-to-Text v1 REST API
//! (`POST /v1/speech:recognize`). The normalized WAV clip is base64-encoded
//! into the request body; recognition is configured for LINEAR16, 16kHz,
//! single-channel audio.
//!
//! The transcript is built by concatenating the top alternative of each
//! result segment, in result order, with no separator. An empty transcript
//! is a valid outcome (silence, noise) and is returned as an empty string,
//! not an error.

use crate::audio::normalizer::TARGET_SAMPLE_RATE;
use crate::error::{AppError, AppResult};
use crate::speech::auth::GoogleAuth;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://speech.googleapis.com";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionConfig<'a> {
    encoding: &'a str,
    sample_rate_hertz: u32,
    language_code: &'a str,
}

#[derive(Debug, Serialize)]
struct RecognitionAudio {
    content: String,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: RecognitionConfig<'a>,
    audio: RecognitionAudio,
}

#[derive(Debug, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<RecognitionAlternative>,
}

#[derive(Debug, Deserialize)]
struct RecognitionAlternative {
    #[serde(default)]
    transcript: String,
}

/// Transcribes normalized audio via Google Cloud Speech-to-Text.
#[derive(Debug, Clone)]
pub struct TranscriptionClient {
    client: reqwest::Client,
    auth: GoogleAuth,
    base_url: String,
    language: String,
}

impl TranscriptionClient {
    /// Create a new client.
    ///
    /// ## Parameters:
    /// - **auth**: Bearer-token source (shared with the TTS client)
    /// - **language**: BCP-47 language code, e.g. "en-US"
    /// - **timeout**: Per-request timeout for the recognition call
    pub fn new(auth: GoogleAuth, language: String, timeout: Duration) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            language,
        })
    }

    /// Point the client at a different API host (tests).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Transcribe a mono 16kHz 16-bit WAV clip.
    ///
    /// ## Returns:
    /// The concatenated transcript; empty if the service recognized
    /// nothing.
    pub async fn transcribe(&self, wav: &[u8]) -> AppResult<String> {
        debug!(audio_bytes = wav.len(), "starting transcription");

        let token = self.auth.bearer_token().await?;
        let request = RecognizeRequest {
            config: RecognitionConfig {
                encoding: "LINEAR16",
                sample_rate_hertz: TARGET_SAMPLE_RATE,
                language_code: &self.language,
            },
            audio: RecognitionAudio {
                content: base64::engine::general_purpose::STANDARD.encode(wav),
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/speech:recognize", self.base_url))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Transcription(format!("recognize request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Transcription(format!(
                "recognize API error {}: {}",
                status, body
            )));
        }

        let result: RecognizeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Transcription(format!("recognize parse error: {}", e)))?;

        // Top alternative of each segment, in order, no separator, the
        // same concatenation every downstream consumer expects.
        let transcript: String = result
            .results
            .iter()
            .filter_map(|r| r.alternatives.first())
            .map(|a| a.transcript.as_str())
            .collect();

        info!(transcript = %transcript, "transcription complete");
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(server: &mockito::ServerGuard) -> TranscriptionClient {
        TranscriptionClient::new(
            GoogleAuth::from_static_token("test-token"),
            "en-US".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(server.url())
    }

    #[tokio::test]
    async fn concatenates_top_alternatives_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/speech:recognize")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(
                r#"{"results": [
                    {"alternatives": [{"transcript": "I want to "}, {"transcript": "wrong"}]},
                    {"alternatives": [{"transcript": "order a pizza"}]}
                ]}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server);
        let transcript = client.transcribe(b"RIFF-fake-wav").await.unwrap();
        assert_eq!(transcript, "I want to order a pizza");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn empty_results_give_empty_transcript() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/speech:recognize")
            .with_status(200)
            .with_body(r#"{}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let transcript = client.transcribe(b"RIFF-fake-wav").await.unwrap();
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn api_error_maps_to_transcription_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/speech:recognize")
            .with_status(403)
            .with_body(r#"{"error": {"message": "forbidden"}}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let err = client.transcribe(b"RIFF-fake-wav").await.unwrap_err();
        assert!(matches!(err, AppError::Transcription(_)));
    }
}
