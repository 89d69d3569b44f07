//! services/api/src/adapters/openai_llm.rs
//!
//! This module contains the adapter for OpenAI-compatible chat completion APIs.
//! It implements the `CompletionService` port from the `core` crate.

use ai_chat_core::domain::{ConversationTurn, Role};
use ai_chat_core::ports::{CompletionReply, CompletionRequest, CompletionService, PortError, PortResult};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

fn to_request_message(turn: &ConversationTurn) -> PortResult<ChatCompletionRequestMessage> {
    let message = match turn.role {
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(turn.content.as_str())
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(turn.content.as_str())
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
    };
    Ok(message)
}

/// API-level rejections are the backend's answer; everything else is transport.
fn map_openai_error(e: OpenAIError) -> PortError {
    match e {
        OpenAIError::ApiError(api) => PortError::BackendResponse(api.to_string()),
        other => PortError::BackendRequest(other.to_string()),
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OpenAiChatAdapter {
    /// Sends the context window as a chat completion. `top_k` has no equivalent here.
    async fn chat(&self, request: CompletionRequest) -> PortResult<CompletionReply> {
        let messages = request
            .messages
            .iter()
            .map(to_request_message)
            .collect::<PortResult<Vec<_>>>()?;

        if request.stream {
            debug!("Streaming requested; collecting the full completion instead.");
        }

        let completion = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(request.options.temperature)
            .top_p(request.options.top_p)
            .max_tokens(request.options.max_length)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(completion)
            .await
            .map_err(map_openai_error)?;

        let choice = response.choices.into_iter().next().ok_or_else(|| {
            PortError::BackendResponse("Chat completion returned no choices.".to_string())
        })?;

        Ok(CompletionReply {
            content: choice.message.content,
        })
    }
}
