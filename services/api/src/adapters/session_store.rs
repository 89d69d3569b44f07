//! services/api/src/adapters/session_store.rs
//!
//! An in-process implementation of the `SessionStore` port. Sessions live for
//! the lifetime of the server process.

use ai_chat_core::domain::ChatSession;
use ai_chat_core::ports::{PortResult, SessionStore};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, ChatSession>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load_session(&self, session_id: &str) -> PortResult<ChatSession> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(session_id).cloned().unwrap_or_default())
    }

    async fn save_session(&self, session_id: &str, session: ChatSession) -> PortResult<()> {
        self.sessions
            .write()
            .await
            .insert(session_id.to_string(), session);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_chat_core::domain::{ContextSize, Role};

    #[tokio::test]
    async fn test_unknown_session_is_empty() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.load_session("nope").await.unwrap(), ChatSession::default());
    }

    #[tokio::test]
    async fn test_saved_session_round_trips() {
        let store = InMemorySessionStore::new();
        let mut session = ChatSession {
            user_id: Some("dave".to_string()),
            ..Default::default()
        };
        session.append(Role::Assistant, "hi", ContextSize::Window(5));

        store.save_session("s1", session.clone()).await.unwrap();

        assert_eq!(store.load_session("s1").await.unwrap(), session);
        assert_eq!(store.load_session("s2").await.unwrap(), ChatSession::default());
    }
}
