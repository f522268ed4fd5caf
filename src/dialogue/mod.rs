//! # Dialogue Module
//!
//! Everything between the transcript and the reply text:
//! - **persona**: The ChefBot restaurant persona and canned greeting
//! - **session**: Per-client conversation histories with idle eviction
//! - **gemini**: Chat-completion client for the Gemini REST API
//! - **actions**: Detection of simulated order/booking confirmations in
//!   reply text

pub mod actions;
pub mod gemini;
pub mod persona;
pub mod session;

pub use actions::SimulatedAction;
pub use gemini::ChatClient;
pub use session::{DialogueSession, Role, SessionRegistry, Turn};
