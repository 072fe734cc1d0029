//! Shared fixtures for integration tests

use voxchat::{ConversationContext, Message, Sender};

/// A conversation with names but no log entries
#[must_use]
pub fn empty_context() -> ConversationContext {
    ConversationContext {
        introduction: None,
        memory: None,
        authors_note: None,
        ai_name: "Aria".to_string(),
        user_name: "Sam".to_string(),
        voice_seed: "alloy".to_string(),
        messages: Vec::new(),
    }
}

/// A conversation with intro/memory/note and a few turns
#[must_use]
pub fn seeded_context() -> ConversationContext {
    let mut ctx = empty_context();
    ctx.introduction = Some("Aria is a cheerful assistant.".to_string());
    ctx.memory = Some("Sam likes coffee.".to_string());
    ctx.messages = vec![
        Message::now(Sender::User, "good morning"),
        Message::now(Sender::Ai, "morning! coffee first?"),
        Message::now(Sender::Director, "the kettle starts to whistle"),
    ];
    ctx
}
