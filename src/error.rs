//! # Error Handling
//!
//! Defines the error taxonomy for the voice pipeline and how each class of
//! failure is converted into an HTTP response.
//!
//! ## Error Classes:
//! - **BadRequest**: The client sent an unusable request (missing `audio`
//!   field, oversized upload) → 400
//! - **AudioDecode**: The uploaded bytes could not be decoded as audio → 500
//! - **Transcription / Dialogue / Synthesis**: One of the three upstream
//!   cloud services failed → 502
//! - **Config / Internal**: Server-side problems → 500
//!
//! ## Response Policy:
//! All error responses are a flat JSON object `{"error": "..."}`. Client
//! errors echo their message (the caller needs to know what to fix); server
//! and upstream errors return a *stable public message* per class while the
//! raw detail (upstream status codes, decoder output, exception text) is
//! written to the tracing log only. This keeps internal details out of the
//! response body.

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;
use tracing::error;

/// Error type covering every failure mode of the request pipeline.
///
/// Each variant carries the *internal* detail message. Whether that message
/// is shown to the client depends on the variant (see module docs).
#[derive(Debug)]
pub enum AppError {
    /// Client sent an invalid or incomplete request
    BadRequest(String),

    /// Uploaded bytes could not be decoded by the audio codec layer
    AudioDecode(String),

    /// Speech-to-text service call failed
    Transcription(String),

    /// Chat-completion service call failed
    Dialogue(String),

    /// Text-to-speech service call failed
    Synthesis(String),

    /// Configuration file or environment variable problems
    Config(String),

    /// Anything else that went wrong server-side
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::AudioDecode(msg) => write!(f, "Audio decode error: {}", msg),
            AppError::Transcription(msg) => write!(f, "Transcription error: {}", msg),
            AppError::Dialogue(msg) => write!(f, "Dialogue error: {}", msg),
            AppError::Synthesis(msg) => write!(f, "Synthesis error: {}", msg),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// The message the client is allowed to see. Upstream/internal detail
    /// stays in the log.
    fn public_message(&self) -> String {
        match self {
            AppError::BadRequest(msg) => msg.clone(),
            AppError::AudioDecode(_) => "Could not decode the uploaded audio".to_string(),
            AppError::Transcription(_) => "Speech recognition service failed".to_string(),
            AppError::Dialogue(_) => "Language model service failed".to_string(),
            AppError::Synthesis(_) => "Speech synthesis service failed".to_string(),
            AppError::Config(_) => "Server configuration error".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        use actix_web::http::StatusCode;
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Transcription(_) | AppError::Dialogue(_) | AppError::Synthesis(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::AudioDecode(_) | AppError::Config(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Full detail is logged exactly once, here, as the error leaves the
        // pipeline and becomes a response.
        error!(status = %status.as_u16(), detail = %self, "request failed");

        HttpResponse::build(status).json(json!({ "error": self.public_message() }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Shorthand for `Result<T, AppError>`.
pub type AppResult<T> = Result<T, AppError>;
