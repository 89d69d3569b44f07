pub mod context;
pub mod domain;
pub mod extract;
pub mod persist;
pub mod ports;
pub mod settings;
pub mod turn;

pub use domain::{
    AssessmentRecord, ChatSession, ContextSize, ConversationTurn, GenerationOptions,
    GenerationProfile, Mode, ParsedAssessment, ProfileOverrides, PromptTemplate, Role, Score,
    SessionHistory,
};
pub use extract::{extract, MalformedResponseError};
pub use persist::{PersistOutcome, ResultPersister};
pub use ports::{
    AssessmentStore, CompletionReply, CompletionRequest, CompletionService, PortError, PortResult,
    SessionStore,
};
pub use settings::SettingsResolver;
pub use turn::{TurnInput, TurnOrchestrator, TurnReply};
