//! # Voice Pipeline
//!
//! The end-to-end path behind `/process_audio`: normalize the uploaded
//! clip, transcribe it, run one dialogue turn against the session's
//! history, detect simulated actions, and synthesize the reply. The
//! stages are strictly sequential; the session mutex is held from the
//! transcript append through the reply append so concurrent requests on
//! one session cannot interleave turns.

use crate::audio::AudioNormalizer;
use crate::dialogue::{actions, ChatClient, SessionRegistry};
use crate::error::AppResult;
use crate::speech::{SynthesisClient, TranscriptionClient};
use std::sync::Arc;
use tracing::{debug, info};

/// Canned reply when the recognizer hears nothing usable.
pub const EMPTY_TRANSCRIPT_REPLY: &str = "I didn't catch that. Could you please repeat?";

/// Result of one pipeline run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// A full turn: the reply text and its MP3 rendering.
    Reply { text: String, mp3: Vec<u8> },
    /// The clip decoded fine but transcribed to nothing. The session is
    /// left untouched and no synthesis happens.
    EmptyTranscript,
}

/// Owns the pipeline stages and the session registry.
pub struct VoicePipeline {
    normalizer: AudioNormalizer,
    stt: TranscriptionClient,
    chat: ChatClient,
    tts: SynthesisClient,
    sessions: Arc<SessionRegistry>,
}

impl VoicePipeline {
    pub fn new(
        normalizer: AudioNormalizer,
        stt: TranscriptionClient,
        chat: ChatClient,
        tts: SynthesisClient,
        sessions: Arc<SessionRegistry>,
    ) -> Self {
        Self {
            normalizer,
            stt,
            chat,
            tts,
            sessions,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Run one voice turn.
    ///
    /// ## Parameters:
    /// - **audio**: Raw uploaded bytes in whatever container the client sent
    /// - **mime_type**: The upload's declared content type, if any
    /// - **session_id**: Resolved session identifier (see
    ///   `SessionRegistry::resolve_id`)
    pub async fn run(
        &self,
        audio: Vec<u8>,
        mime_type: Option<&str>,
        session_id: &str,
    ) -> AppResult<PipelineOutcome> {
        let normalized = self.normalizer.normalize(audio, mime_type)?;
        info!(
            session_id = %session_id,
            duration_seconds = %format!("{:.2}", normalized.duration_seconds),
            "audio normalized"
        );

        let transcript = self.stt.transcribe(&normalized.wav).await?;
        if transcript.trim().is_empty() {
            info!(session_id = %session_id, "transcript empty, skipping dialogue turn");
            return Ok(PipelineOutcome::EmptyTranscript);
        }
        info!(session_id = %session_id, "Customer said: {}", transcript);

        let session = self.sessions.get_or_create(session_id);
        let reply = {
            // Hold the session for the whole turn.
            let mut session = session.lock().await;
            debug!(session_id = %session.id, turns = session.turn_count(), "session locked");
            session.push_user(transcript);
            let reply = match self.chat.generate(session.history()).await {
                Ok(reply) => reply,
                Err(e) => {
                    // Roll back the user turn so a retry replays cleanly.
                    session.pop_user();
                    return Err(e);
                }
            };
            session.push_model(reply.clone());
            reply
        };
        info!(session_id = %session_id, "ChefBot replied: {}", reply);

        actions::detect_and_log(&reply);

        let mp3 = self.tts.synthesize(&reply).await?;
        Ok(PipelineOutcome::Reply { text: reply, mp3 })
    }
}
