//! Prompt assembly
//!
//! Renders a bounded window of the message log into one text block for the
//! generator. Placement is deterministic: introduction and memory lead,
//! the author's note rides ten messages from the end of the window as a
//! recency-weighted hint, and history older than the window is dropped
//! outright rather than summarized.

use super::{ConversationContext, Sender};

/// Maximum number of log messages rendered into a prompt
pub const PROMPT_WINDOW: usize = 2000;

/// Offset from the window end where the author's note is inserted
const AUTHORS_NOTE_OFFSET: usize = 10;

fn is_present(field: Option<&String>) -> Option<&str> {
    field.map(String::as_str).filter(|s| !s.trim().is_empty())
}

/// Render the context into a single ordered prompt
///
/// The author's note attaches to the message at `window_len - 10`; windows
/// shorter than ten messages never receive it.
#[must_use]
pub fn build_prompt(context: &ConversationContext) -> String {
    let mut prompt = String::new();

    if let Some(introduction) = is_present(context.introduction.as_ref()) {
        prompt.push_str(introduction);
        prompt.push('\n');
    }
    if let Some(memory) = is_present(context.memory.as_ref()) {
        prompt.push_str(memory);
        prompt.push('\n');
    }

    let window_start = context.messages.len().saturating_sub(PROMPT_WINDOW);
    let window = &context.messages[window_start..];
    let authors_note = is_present(context.authors_note.as_ref());

    for (i, message) in window.iter().enumerate() {
        prompt.push('\n');
        match message.sender {
            Sender::Ai => {
                prompt.push_str(&context.ai_name);
                prompt.push_str(":\n");
                prompt.push_str(&message.text);
            }
            Sender::User => {
                prompt.push_str(&context.user_name);
                prompt.push_str(":\n");
                prompt.push_str(&message.text);
            }
            Sender::Director => {
                prompt.push('(');
                prompt.push_str(&message.text);
                prompt.push(')');
            }
        }

        if let Some(note) = authors_note
            && i + AUTHORS_NOTE_OFFSET == window.len()
        {
            prompt.push_str("\n[");
            prompt.push_str(note);
            prompt.push(']');
        }
    }

    prompt.push('\n');
    prompt
}
