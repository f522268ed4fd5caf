//! # Voice Turn Handler
//!
//! The `POST /process_audio` endpoint: accepts a multipart upload with
//! the recorded clip, runs the voice pipeline, and answers with either
//! the spoken reply as MP3 or a canned JSON fallback when nothing was
//! recognized.
//!
//! ## Request:
//! Multipart form data:
//! - **audio** (required): The recorded clip, any decodable container
//! - **session** (optional): Conversation identifier; the `X-Session-Id`
//!   header works too, and requests without either share the default
//!   conversation
//!
//! ## Response:
//! - `200` with `audio/mpeg` body and `X-Session-Id` header on a full turn
//! - `200` with `{"text": "...", "audio": ""}` when the transcript is empty
//! - `400` with `{"error": "No audio file provided"}` when the audio part
//!   is missing

use crate::error::AppError;
use crate::pipeline::{PipelineOutcome, EMPTY_TRANSCRIPT_REPLY};
use crate::state::AppState;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

/// The uploaded clip plus the form's session field.
struct ProcessUpload {
    audio: Vec<u8>,
    mime_type: Option<String>,
    session: Option<String>,
}

async fn read_upload(
    mut payload: actix_multipart::Multipart,
    max_bytes: usize,
) -> Result<ProcessUpload, AppError> {
    use actix_multipart::Field;
    use futures_util::stream::StreamExt;

    let mut audio: Option<Vec<u8>> = None;
    let mut mime_type: Option<String> = None;
    let mut session: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field: Field =
            item.map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?;

        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .map(|name| name.to_string());

        match field_name.as_deref() {
            Some("audio") => {
                mime_type = field.content_type().map(|m| m.to_string());

                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk =
                        chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
                    if bytes.len() + chunk.len() > max_bytes {
                        return Err(AppError::BadRequest(format!(
                            "Audio upload too large (max: {} bytes)",
                            max_bytes
                        )));
                    }
                    bytes.extend_from_slice(&chunk);
                }
                audio = Some(bytes);
            }
            Some("session") => {
                let mut bytes = Vec::new();
                while let Some(chunk) = field.next().await {
                    let chunk =
                        chunk.map_err(|e| AppError::BadRequest(format!("Chunk error: {}", e)))?;
                    bytes.extend_from_slice(&chunk);
                }
                session = String::from_utf8(bytes).ok();
            }
            // Unknown parts are drained by dropping the field.
            _ => {}
        }
    }

    let audio = audio.ok_or_else(|| AppError::BadRequest("No audio file provided".to_string()))?;

    Ok(ProcessUpload {
        audio,
        mime_type,
        session,
    })
}

pub async fn process_audio(
    req: HttpRequest,
    payload: actix_multipart::Multipart,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let request_id = Uuid::new_v4();
    let config = state.get_config();

    let upload = read_upload(payload, config.limits.max_upload_bytes).await?;
    if upload.audio.is_empty() {
        return Err(AppError::BadRequest("No audio file provided".to_string()));
    }

    // Form field wins over header.
    let header_session = req
        .headers()
        .get("X-Session-Id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());
    let session_id = crate::dialogue::SessionRegistry::resolve_id(
        upload.session.as_deref().or(header_session.as_deref()),
    );

    info!(
        request_id = %request_id,
        session_id = %session_id,
        bytes = upload.audio.len(),
        mime_type = upload.mime_type.as_deref().unwrap_or("unknown"),
        "processing voice turn"
    );

    let outcome = state
        .pipeline
        .run(upload.audio, upload.mime_type.as_deref(), &session_id)
        .await?;

    match outcome {
        PipelineOutcome::Reply { text, mp3 } => {
            info!(
                request_id = %request_id,
                session_id = %session_id,
                reply_chars = text.len(),
                mp3_bytes = mp3.len(),
                "voice turn complete"
            );
            Ok(HttpResponse::Ok()
                .content_type("audio/mpeg")
                .insert_header(("X-Session-Id", session_id))
                .body(mp3))
        }
        PipelineOutcome::EmptyTranscript => Ok(HttpResponse::Ok()
            .insert_header(("X-Session-Id", session_id))
            .json(json!({
                "text": EMPTY_TRANSCRIPT_REPLY,
                "audio": ""
            }))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioNormalizer;
    use crate::config::AppConfig;
    use crate::dialogue::{ChatClient, SessionRegistry};
    use crate::pipeline::VoicePipeline;
    use crate::speech::{GoogleAuth, SynthesisClient, TranscriptionClient};
    use actix_web::{test, App};
    use std::sync::Arc;
    use std::time::Duration;

    /// Build an `AppState` for handler tests; when an STT server is given
    /// the transcription client is pointed at it.
    fn test_state(stt: Option<&mockito::ServerGuard>) -> AppState {
        let timeout = Duration::from_secs(5);
        let auth = GoogleAuth::from_static_token("test-token");

        let mut stt_client =
            TranscriptionClient::new(auth.clone(), "en-US".to_string(), timeout).unwrap();
        if let Some(server) = stt {
            stt_client = stt_client.with_base_url(server.url());
        }

        let pipeline = VoicePipeline::new(
            AudioNormalizer::new(),
            stt_client,
            ChatClient::new("test-key".to_string(), "gemini-1.5-flash".to_string(), timeout)
                .unwrap(),
            SynthesisClient::new(auth, "en-US".to_string(), "FEMALE".to_string(), timeout)
                .unwrap(),
            Arc::new(SessionRegistry::new(1800)),
        );
        AppState::new(AppConfig::default(), Arc::new(pipeline))
    }

    /// A short mono 16kHz WAV clip.
    fn fixture_wav() -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = std::io::Cursor::new(Vec::new());
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for i in 0..1600 {
            let t = i as f64 / 16_000.0;
            let sample = (0.4 * (2.0 * std::f64::consts::PI * 440.0 * t).sin() * 32767.0) as i16;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();
        cursor.into_inner()
    }

    fn multipart_body(boundary: &str, parts: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, data) in parts {
            body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
            body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
        body
    }

    #[actix_web::test]
    async fn missing_audio_part_is_a_bad_request() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(None)))
                .route("/process_audio", web::post().to(process_audio)),
        )
        .await;

        let boundary = "test-boundary";
        let body = multipart_body(boundary, &[("session", b"table-7")]);
        let req = test::TestRequest::post()
            .uri("/process_audio")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body, serde_json::json!({"error": "No audio file provided"}));
    }

    #[actix_web::test]
    async fn empty_transcript_returns_canned_json() {
        let mut stt = mockito::Server::new_async().await;
        stt.mock("POST", "/v1/speech:recognize")
            .with_status(200)
            .with_body(r#"{}"#)
            .create_async()
            .await;

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(Some(&stt))))
                .route("/process_audio", web::post().to(process_audio)),
        )
        .await;

        let boundary = "test-boundary";
        let wav = fixture_wav();
        let body = multipart_body(boundary, &[("audio", wav.as_slice()), ("session", b"table-7")]);
        let req = test::TestRequest::post()
            .uri("/process_audio")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers().get("X-Session-Id").unwrap(), "table-7");

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(
            body,
            serde_json::json!({
                "text": "I didn't catch that. Could you please repeat?",
                "audio": ""
            })
        );
    }

    #[actix_web::test]
    async fn undecodable_audio_is_a_server_error() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(test_state(None)))
                .route("/process_audio", web::post().to(process_audio)),
        )
        .await;

        let boundary = "test-boundary";
        let body = multipart_body(boundary, &[("audio", b"definitely not audio")]);
        let req = test::TestRequest::post()
            .uri("/process_audio")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", boundary),
            ))
            .set_payload(body)
            .to_request();

        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 500);

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Could not decode the uploaded audio");
    }
}
