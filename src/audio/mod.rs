//! # Audio Processing Module
//!
//! Converts whatever the browser recorded into the one format the speech
//! recognition service accepts.
//!
//! ## Target Format:
//! - **Sample Rate**: 16kHz (16,000 Hz)
//! - **Bit Depth**: 16-bit PCM
//! - **Channels**: Mono (1 channel)
//! - **Container**: WAV (little-endian signed integers)
//!
//! ## Decoding:
//! The uploaded clip can arrive in any container/codec the symphonia
//! library supports (WAV, MP3, OGG/Vorbis, FLAC, AAC/MP4, ...). The
//! declared MIME type of the upload is used as a probe hint only; the
//! actual bytes decide what gets decoded.

pub mod normalizer;

pub use normalizer::{AudioNormalizer, NormalizedAudio};
