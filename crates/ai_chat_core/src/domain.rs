//! crates/ai_chat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or HTTP serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

//=========================================================================================
// Conversation
//=========================================================================================

/// Who authored a turn of the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// The lowercase name used on every wire format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

/// A single message exchanged with the completion backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The conversation mode selected by the client's `menu` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Free-form chat.
    Chat,
    /// Structured language assessment.
    AiTest,
    /// Anything else; gets the default profile and an empty template.
    Other(String),
}

impl Mode {
    pub fn parse(menu: &str) -> Self {
        match menu {
            "chat" => Mode::Chat,
            "aitest" => Mode::AiTest,
            other => Mode::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Mode::Chat => "chat",
            Mode::AiTest => "aitest",
            Mode::Other(name) => name,
        }
    }
}

//=========================================================================================
// Generation Profile
//=========================================================================================

/// How much prior conversation is fed back to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSize {
    /// No truncation at all.
    Unbounded,
    /// No memory: history is cleared on every append.
    Disabled,
    /// Sliding window over the most recent `n` turns.
    Window(usize),
}

impl ContextSize {
    /// Maps the integer setting onto a window; negative values mean unbounded.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            0 => ContextSize::Disabled,
            n if n > 0 => ContextSize::Window(n as usize),
            _ => ContextSize::Unbounded,
        }
    }

    /// The integer form, with `-1` standing in for unbounded.
    pub fn as_raw(&self) -> i64 {
        match self {
            ContextSize::Unbounded => -1,
            ContextSize::Disabled => 0,
            ContextSize::Window(n) => *n as i64,
        }
    }
}

/// The four text fields spliced in front of every user message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptTemplate {
    pub style_instructions: String,
    pub asker_role: String,
    pub responder_role: String,
    pub situational_context: String,
}

/// Sampling parameters forwarded to the completion backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_length: u32,
    pub top_k: u32,
    pub top_p: f32,
}

/// Generation parameters plus the prompt template active for one turn.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationProfile {
    pub temperature: f32,
    pub max_length: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub context_size: ContextSize,
    pub prompt_template: PromptTemplate,
}

impl Default for GenerationProfile {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_length: 100,
            top_k: 40,
            top_p: 0.85,
            context_size: ContextSize::Window(5),
            prompt_template: PromptTemplate::default(),
        }
    }
}

impl GenerationProfile {
    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = temperature;
    }

    pub fn set_max_length(&mut self, max_length: u32) {
        self.max_length = max_length;
    }

    pub fn set_top_k(&mut self, top_k: u32) {
        self.top_k = top_k;
    }

    pub fn set_top_p(&mut self, top_p: f32) {
        self.top_p = top_p;
    }

    pub fn set_context_size(&mut self, context_size: ContextSize) {
        self.context_size = context_size;
    }

    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_length: self.max_length,
            top_k: self.top_k,
            top_p: self.top_p,
        }
    }
}

/// A partial profile; every `Some` field replaces the corresponding profile value.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileOverrides {
    pub temperature: Option<f32>,
    pub max_length: Option<u32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    pub context_size: Option<ContextSize>,
}

impl ProfileOverrides {
    /// Overlays these overrides onto `profile` through its setters.
    pub fn apply_to(&self, profile: &mut GenerationProfile) {
        if let Some(temperature) = self.temperature {
            profile.set_temperature(temperature);
        }
        if let Some(max_length) = self.max_length {
            profile.set_max_length(max_length);
        }
        if let Some(top_k) = self.top_k {
            profile.set_top_k(top_k);
        }
        if let Some(top_p) = self.top_p {
            profile.set_top_p(top_p);
        }
        if let Some(context_size) = self.context_size {
            profile.set_context_size(context_size);
        }
    }
}

//=========================================================================================
// Assessment
//=========================================================================================

pub const DEFAULT_EVALUATION_TEXT: &str = "You're doing great.";
pub const DEFAULT_FOLLOWUP_QUESTION: &str =
    "If you want the next question, please say 'Please next question'";

/// One score of an assessment, as emitted by the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Score {
    /// An integral score.
    Points(i64),
    /// A present value of any other JSON type, kept as-is.
    Raw(serde_json::Value),
}

impl Default for Score {
    fn default() -> Self {
        Score::Points(0)
    }
}

impl Score {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Score::Points(points) => serde_json::Value::from(*points),
            Score::Raw(value) => value.clone(),
        }
    }
}

/// The typed fields extracted from an assessment reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedAssessment {
    pub fluency: Score,
    pub grammar: Score,
    pub vocabulary: Score,
    pub content: Score,
    pub evaluation_text: String,
    pub followup_question: String,
}

impl Default for ParsedAssessment {
    fn default() -> Self {
        Self {
            fluency: Score::default(),
            grammar: Score::default(),
            vocabulary: Score::default(),
            content: Score::default(),
            evaluation_text: DEFAULT_EVALUATION_TEXT.to_string(),
            followup_question: DEFAULT_FOLLOWUP_QUESTION.to_string(),
        }
    }
}

impl ParsedAssessment {
    /// The user-visible reply for an assessment turn.
    pub fn compose_reply(&self) -> String {
        format!("{} {}", self.evaluation_text, self.followup_question)
    }

    /// Rebuilds the payload in the shape the model is asked to emit.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "fluency": self.fluency.to_json(),
            "grammar": self.grammar.to_json(),
            "vocabulary": self.vocabulary.to_json(),
            "content": self.content.to_json(),
            "simpleEvaluation": self.evaluation_text,
            "question": self.followup_question,
        })
    }
}

/// A stored assessment result. Created once per assessment turn.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentRecord {
    pub record_id: Uuid,
    pub user_id: String,
    pub topic_id: String,
    pub timestamp: DateTime<Utc>,
    pub fluency: Option<i64>,
    pub grammar: Option<i64>,
    pub vocabulary: Option<i64>,
    pub content: Option<i64>,
    pub evaluation_text: String,
}

//=========================================================================================
// Session
//=========================================================================================

/// The rolling conversation memory of one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionHistory {
    pub(crate) turns: Vec<ConversationTurn>,
}

impl SessionHistory {
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Everything the service remembers about one browser session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatSession {
    pub user_id: Option<String>,
    pub history: Option<SessionHistory>,
    /// Values the client set explicitly; they win over the per-mode table.
    pub settings: ProfileOverrides,
}
