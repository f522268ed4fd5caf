//! # Dialogue Session Management
//!
//! Holds the conversation histories the chat model is replayed against.
//! Each conversation is an explicit session object:
//!
//! - Sessions are keyed by a client-supplied identifier; requests without
//!   one share the default session, so a single anonymous caller still
//!   gets one continuous conversation for the process lifetime.
//! - Each session's history sits behind its own async mutex. A request
//!   holds the lock for its whole turn (append user turn → model call →
//!   append reply), so concurrent requests on the same session serialize
//!   instead of interleaving.
//! - Sessions are created on first contact, seeded with the persona pair,
//!   and evicted by a background sweeper once idle past the configured
//!   timeout.

use crate::dialogue::persona;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Who produced a turn.
///
/// The chat API distinguishes only user and model; the system persona is
/// carried as the seeded opening user turn (see `persona`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    /// Wire name used by the chat API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One conversational turn.
#[derive(Debug, Clone)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

impl Turn {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// One conversation: an ordered, monotonically growing turn history.
#[derive(Debug)]
pub struct DialogueSession {
    pub id: String,
    history: Vec<Turn>,
    last_activity: DateTime<Utc>,
}

impl DialogueSession {
    /// Create a session seeded with the persona pair.
    fn new(id: String) -> Self {
        Self {
            id,
            history: persona::seed_history(),
            last_activity: Utc::now(),
        }
    }

    /// The full history, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn turn_count(&self) -> usize {
        self.history.len()
    }

    /// Append the user's transcript for this request.
    pub fn push_user(&mut self, text: impl Into<String>) {
        self.history.push(Turn::new(Role::User, text));
        self.touch();
    }

    /// Append the model's reply for this request.
    pub fn push_model(&mut self, text: impl Into<String>) {
        self.history.push(Turn::new(Role::Model, text));
        self.touch();
    }

    /// Remove a just-pushed user turn that never got a model reply, so a
    /// failed turn leaves the history the way it found it.
    pub fn pop_user(&mut self) {
        if matches!(self.history.last(), Some(turn) if turn.role == Role::User) {
            self.history.pop();
        }
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    fn idle_seconds(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.last_activity).num_seconds()
    }
}

/// Session id used when the client does not supply one.
pub const DEFAULT_SESSION_ID: &str = "default";

/// Registry of live dialogue sessions.
///
/// ## Locking:
/// The map itself is behind a std RwLock (held only for lookups, never
/// across an await); each session is behind its own tokio Mutex which *is*
/// held across the model call to serialize the whole turn.
#[derive(Debug)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Mutex<DialogueSession>>>>,
    idle_timeout_secs: u64,
}

impl SessionRegistry {
    pub fn new(idle_timeout_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout_secs,
        }
    }

    /// Resolve the client-supplied identifier, falling back to the shared
    /// default session.
    pub fn resolve_id(requested: Option<&str>) -> String {
        match requested {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            _ => DEFAULT_SESSION_ID.to_string(),
        }
    }

    /// Fetch the session for `id`, creating and seeding it on first
    /// contact.
    pub fn get_or_create(&self, id: &str) -> Arc<Mutex<DialogueSession>> {
        // Fast path: session already exists.
        {
            let sessions = self.sessions.read().unwrap();
            if let Some(session) = sessions.get(id) {
                return session.clone();
            }
        }

        let mut sessions = self.sessions.write().unwrap();
        // Someone may have created it between the locks.
        sessions
            .entry(id.to_string())
            .or_insert_with(|| {
                info!(session_id = %id, "creating dialogue session");
                Arc::new(Mutex::new(DialogueSession::new(id.to_string())))
            })
            .clone()
    }

    /// Number of live sessions.
    pub fn active_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Evict sessions idle past the configured timeout.
    ///
    /// ## Returns:
    /// Number of sessions removed. Sessions currently locked by a request
    /// are never idle (the request touched them), so eviction never races
    /// an in-flight turn in practice; the Arc keeps a just-evicted session
    /// alive until its request completes.
    pub fn evict_idle(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().unwrap();

        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = match session.try_lock() {
                Ok(session) => session.idle_seconds(now) < self.idle_timeout_secs as i64,
                // Locked means a turn is in flight right now.
                Err(_) => true,
            };
            if !keep {
                debug!(session_id = %id, "evicting idle session");
            }
            keep
        });

        before - sessions.len()
    }
}
