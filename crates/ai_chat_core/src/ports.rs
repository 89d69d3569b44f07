//! crates/ai_chat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the completion backend, the database and the session store.

use async_trait::async_trait;

use crate::domain::{AssessmentRecord, ChatSession, ConversationTurn, GenerationOptions};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The completion backend could not be reached or the transport failed.
    #[error("Completion request failed: {0}")]
    BackendRequest(String),
    /// The completion backend answered, but rejected the request or sent garbage.
    #[error("Completion backend returned an error: {0}")]
    BackendResponse(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Completion Backend Wire Types
//=========================================================================================

/// One outbound call to the completion backend.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ConversationTurn>,
    pub stream: bool,
    pub options: GenerationOptions,
}

/// The backend's reply. `content` is `None` when the reply had no message content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionReply {
    pub content: Option<String>,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends the context window to the model and returns its reply.
    async fn chat(&self, request: CompletionRequest) -> PortResult<CompletionReply>;
}

#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn save_assessment(&self, record: AssessmentRecord) -> PortResult<()>;

    /// All records of one user, oldest first.
    async fn get_assessments_for_user(&self, user_id: &str) -> PortResult<Vec<AssessmentRecord>>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a session, returning an empty one when the id is unknown.
    async fn load_session(&self, session_id: &str) -> PortResult<ChatSession>;

    async fn save_session(&self, session_id: &str, session: ChatSession) -> PortResult<()>;
}
