//! crates/ai_chat_core/src/turn.rs
//!
//! Runs one conversational turn: profile resolution, prompt composition, the
//! backend call, and mode-specific handling of the reply.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::context::build_context;
use crate::domain::{ChatSession, ConversationTurn, GenerationProfile, Mode, PromptTemplate, Role};
use crate::extract::{extract, MalformedResponseError};
use crate::persist::ResultPersister;
use crate::ports::{CompletionReply, CompletionRequest, CompletionService, PortError};
use crate::settings::SettingsResolver;

/// The message reported to clients whenever an assessment reply can't be parsed.
pub const EXTRACTION_FAILED_MESSAGE: &str = "An error occurred while parsing the AI response.";

/// Separator placed between the template fields and the user message.
const PROMPT_SEPARATOR: &str = " | ";

/// Everything that can go wrong inside a turn. Never escapes [`TurnOrchestrator::handle_turn`].
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Port(#[from] PortError),
    #[error("Completion request timed out after {0:?}")]
    Timeout(Duration),
    #[error("{}", EXTRACTION_FAILED_MESSAGE)]
    Extraction(#[from] MalformedResponseError),
}

/// One inbound user message and its request options.
#[derive(Debug, Clone)]
pub struct TurnInput<'a> {
    pub mode: Mode,
    pub user_message: &'a str,
    pub stream: bool,
    pub topic_id: Option<&'a str>,
}

/// What the caller sends back to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnReply {
    Content(String),
    Failed { error: String },
}

impl TurnReply {
    pub fn content(&self) -> &str {
        match self {
            TurnReply::Content(content) => content,
            TurnReply::Failed { .. } => "",
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            TurnReply::Content(_) => None,
            TurnReply::Failed { error } => Some(error),
        }
    }
}

/// Joins the template fields and the user's message into a single prompt.
pub fn compose_prompt(template: &PromptTemplate, user_message: &str) -> String {
    [
        template.style_instructions.as_str(),
        template.asker_role.as_str(),
        template.responder_role.as_str(),
        template.situational_context.as_str(),
        user_message,
    ]
    .join(PROMPT_SEPARATOR)
}

#[derive(Clone)]
pub struct TurnOrchestrator {
    completion: Arc<dyn CompletionService>,
    persister: ResultPersister,
    resolver: SettingsResolver,
    backend_timeout: Duration,
}

impl TurnOrchestrator {
    pub fn new(
        completion: Arc<dyn CompletionService>,
        persister: ResultPersister,
        resolver: SettingsResolver,
        backend_timeout: Duration,
    ) -> Self {
        Self {
            completion,
            persister,
            resolver,
            backend_timeout,
        }
    }

    pub fn resolver(&self) -> &SettingsResolver {
        &self.resolver
    }

    /// Handles one turn for `session`. Failures are reported in the reply, never returned.
    pub async fn handle_turn(&self, session: &mut ChatSession, input: TurnInput<'_>) -> TurnReply {
        match self.run_turn(session, &input).await {
            Ok(content) => TurnReply::Content(content),
            Err(e) => {
                error!("Turn in mode {} failed: {}", input.mode.as_str(), e);
                TurnReply::Failed {
                    error: e.to_string(),
                }
            }
        }
    }

    async fn run_turn(
        &self,
        session: &mut ChatSession,
        input: &TurnInput<'_>,
    ) -> Result<String, TurnError> {
        let profile = self
            .resolver
            .resolve_for_session(&session.settings, &input.mode);

        let prompt = compose_prompt(&profile.prompt_template, input.user_message);
        let messages = build_context(
            session.history.as_ref(),
            profile.context_size,
            ConversationTurn::user(prompt),
        );
        debug!("Sending {} context messages", messages.len());

        let reply = self.call_backend(messages, &profile, input.stream).await?;

        match input.mode {
            Mode::AiTest => self.finish_assessment(session, input, reply).await,
            Mode::Chat => Ok(finish_chat(session, &profile, reply)),
            Mode::Other(_) => Ok(reply.content.unwrap_or_default()),
        }
    }

    async fn call_backend(
        &self,
        messages: Vec<ConversationTurn>,
        profile: &GenerationProfile,
        stream: bool,
    ) -> Result<CompletionReply, TurnError> {
        let request = CompletionRequest {
            messages,
            stream,
            options: profile.options(),
        };

        let started = Instant::now();
        let reply = tokio::time::timeout(self.backend_timeout, self.completion.chat(request))
            .await
            .map_err(|_| TurnError::Timeout(self.backend_timeout))??;
        info!("⏱️ Completion took: {:?}", started.elapsed());
        Ok(reply)
    }

    async fn finish_assessment(
        &self,
        session: &ChatSession,
        input: &TurnInput<'_>,
        reply: CompletionReply,
    ) -> Result<String, TurnError> {
        let raw = reply.content.unwrap_or_default();
        debug!("Handling assessment reply: {}", raw);

        let parsed = extract(&raw).inspect_err(|e| {
            error!("Failed to parse assessment reply: {}", e);
        })?;

        let outcome = self
            .persister
            .persist(session.user_id.as_deref(), input.topic_id, &parsed)
            .await;
        if !outcome.is_saved() {
            warn!("Failed to save the assessment result, but proceeding to send the reply.");
        }

        Ok(parsed.compose_reply())
    }
}

fn finish_chat(session: &mut ChatSession, profile: &GenerationProfile, reply: CompletionReply) -> String {
    match reply.content {
        Some(content) => {
            session.append(Role::Assistant, content.clone(), profile.context_size);
            content
        }
        None => String::new(),
    }
}
