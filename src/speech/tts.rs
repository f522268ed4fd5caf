//! # Text-to-Speech Client
//!
//! Synthesis against the Google Cloud Text-to-Speech v1 REST API
//! (`POST /v1/text:synthesize`). Requests an en-US female voice with MP3
//! output; the response carries the audio base64-encoded in
//! `audioContent`.

use crate::error::{AppError, AppResult};
use crate::speech::auth::GoogleAuth;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://texttospeech.googleapis.com";

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Synthesizes reply text into MP3 audio.
#[derive(Debug, Clone)]
pub struct SynthesisClient {
    client: reqwest::Client,
    auth: GoogleAuth,
    base_url: String,
    language: String,
    gender: String,
}

impl SynthesisClient {
    /// Create a new client.
    ///
    /// ## Parameters:
    /// - **auth**: Bearer-token source (shared with the STT client)
    /// - **language** / **gender**: Voice selection, e.g. "en-US" / "FEMALE"
    /// - **timeout**: Per-request timeout for the synthesis call
    pub fn new(
        auth: GoogleAuth,
        language: String,
        gender: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            client,
            auth,
            base_url: DEFAULT_BASE_URL.to_string(),
            language,
            gender,
        })
    }

    /// Point the client at a different API host (tests).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Synthesize text to MP3 bytes.
    pub async fn synthesize(&self, text: &str) -> AppResult<Vec<u8>> {
        debug!(chars = text.len(), "starting synthesis");

        let token = self.auth.bearer_token().await?;
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.language,
                ssml_gender: &self.gender,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .bearer_auth(token)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Synthesis(format!("synthesize request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Synthesis(format!(
                "synthesize API error {}: {}",
                status, body
            )));
        }

        let result: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| AppError::Synthesis(format!("synthesize parse error: {}", e)))?;

        base64::engine::general_purpose::STANDARD
            .decode(result.audio_content)
            .map_err(|e| AppError::Synthesis(format!("invalid audio content encoding: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(server: &mockito::ServerGuard) -> SynthesisClient {
        SynthesisClient::new(
            GoogleAuth::from_static_token("test-token"),
            "en-US".to_string(),
            "FEMALE".to_string(),
            Duration::from_secs(5),
        )
        .unwrap()
        .with_base_url(server.url())
    }

    #[tokio::test]
    async fn decodes_audio_content() {
        let mp3 = b"ID3-not-really-mp3";
        let encoded = base64::engine::general_purpose::STANDARD.encode(mp3);

        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/text:synthesize")
            .match_header("authorization", "Bearer test-token")
            .with_status(200)
            .with_body(format!(r#"{{"audioContent": "{}"}}"#, encoded))
            .create_async()
            .await;

        let client = test_client(&server);
        let audio = client.synthesize("We close at 10 PM daily.").await.unwrap();
        assert_eq!(audio, mp3);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn api_error_maps_to_synthesis_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/text:synthesize")
            .with_status(500)
            .with_body("upstream broke")
            .create_async()
            .await;

        let client = test_client(&server);
        let err = client.synthesize("hello").await.unwrap_err();
        assert!(matches!(err, AppError::Synthesis(_)));
    }
}
