//! Conversation context model
//!
//! The durable data model for one conversation session: an ordered message
//! log plus session metadata. The log is reloaded from disk at the start of
//! every action and written back after every mutation, so external edits
//! between turns are picked up rather than clobbered by stale state.

mod director;
mod prompt;
mod store;

pub use director::add_director_note_if_needed;
pub use prompt::{PROMPT_WINDOW, build_prompt};
pub use store::ContextStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human speaker
    User,
    /// The assistant
    Ai,
    /// Synthetic annotation (time passage or spoken instruction)
    Director,
}

/// One entry in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,

    /// UTC timestamp; `None` only for the very first message ever recorded
    pub date: Option<DateTime<Utc>>,

    pub text: String,
}

impl Message {
    /// Create a message stamped with the current time
    #[must_use]
    pub fn now(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            date: Some(Utc::now()),
            text: text.into(),
        }
    }
}

/// One conversation session
///
/// `introduction`, `memory` and `authors_note` are free text; blank values
/// are suppressed at prompt time, non-blank values are included verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    pub introduction: Option<String>,
    pub memory: Option<String>,
    pub authors_note: Option<String>,

    /// Display label for AI messages in the prompt
    pub ai_name: String,

    /// Display label for user messages in the prompt
    pub user_name: String,

    /// Opaque voice identifier consumed by the synthesis collaborator
    pub voice_seed: String,

    /// Insertion order defines turn order
    pub messages: Vec<Message>,
}

impl ConversationContext {
    /// Last message in the log, if any
    #[must_use]
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Append a message to the log
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Remove and return the chronologically last message
    ///
    /// The single mutation besides append that the log supports.
    pub fn delete_last(&mut self) -> Option<Message> {
        self.messages.pop()
    }
}
