//! voxchat: push-to-talk voice conversations with a language model
//!
//! Records utterances from the microphone, segments them on trailing
//! silence, transcribes them, and feeds a rolling conversation log to a
//! completion endpoint. Replies can be spoken back through TTS. The
//! conversation is persisted as JSON after every change.

pub mod config;
pub mod context;
pub mod error;
pub mod generate;
pub mod orchestrator;
pub mod voice;

pub use config::Config;
pub use context::{ConversationContext, ContextStore, Message, Sender};
pub use error::{Error, Result};
pub use orchestrator::TurnOrchestrator;
