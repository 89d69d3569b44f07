//! crates/ai_chat_core/src/context.rs
//!
//! Conversation memory: a per-session sliding window of turns, and the
//! context sequence sent to the backend on every request.

use crate::domain::{ChatSession, ContextSize, ConversationTurn, Role, SessionHistory};

impl SessionHistory {
    /// Appends a turn, then enforces `context_size`.
    pub fn push(&mut self, turn: ConversationTurn, context_size: ContextSize) {
        self.turns.push(turn);
        self.truncate_to(context_size);
    }

    /// Drops the oldest turns until the history fits `context_size`.
    pub fn truncate_to(&mut self, context_size: ContextSize) {
        match context_size {
            ContextSize::Window(n) if self.turns.len() > n => {
                let excess = self.turns.len() - n;
                self.turns.drain(..excess);
            }
            ContextSize::Disabled => self.turns.clear(),
            _ => {}
        }
    }
}

impl ChatSession {
    /// Records a turn, creating the history on first use.
    pub fn append(&mut self, role: Role, content: impl Into<String>, context_size: ContextSize) {
        let turn = ConversationTurn {
            role,
            content: content.into(),
        };
        self.history
            .get_or_insert_with(SessionHistory::default)
            .push(turn, context_size);
    }

    pub fn clear_history(&mut self) {
        self.history = None;
    }
}

/// The messages for one backend call: prior history (when memory is on) plus the new turn.
pub fn build_context(
    history: Option<&SessionHistory>,
    context_size: ContextSize,
    new_user_turn: ConversationTurn,
) -> Vec<ConversationTurn> {
    match history {
        Some(history) if context_size != ContextSize::Disabled => {
            let mut messages = Vec::with_capacity(history.len() + 1);
            messages.extend_from_slice(history.turns());
            messages.push(new_user_turn);
            messages
        }
        _ => vec![new_user_turn],
    }
}
