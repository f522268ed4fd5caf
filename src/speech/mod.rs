//! # Cloud Speech Services
//!
//! REST clients for the two Google Cloud speech services:
//! - **stt**: Speech-to-Text (`speech:recognize`): normalized WAV in,
//!   transcript out
//! - **tts**: Text-to-Speech (`text:synthesize`): reply text in, MP3 out
//!
//! Both authenticate with an OAuth2 bearer token minted from the
//! service-account key (see `auth`). The clients are constructed once at
//! process start and shared by all requests.

pub mod auth;
pub mod stt;
pub mod tts;

pub use auth::GoogleAuth;
pub use stt::TranscriptionClient;
pub use tts::SynthesisClient;
