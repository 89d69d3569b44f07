//! crates/ai_chat_core/src/settings.rs
//!
//! Maps a conversation mode onto the generation profile and prompt template
//! used for a single turn. Resolution always produces a fresh value; callers
//! own the result for the lifetime of their request.

use tracing::debug;

use crate::domain::{ContextSize, GenerationProfile, Mode, ProfileOverrides, PromptTemplate};

const AITEST_STYLE: &str = "Assume the role of an English teacher assessing an intermediate-level English learner. \
First, provide a question in English to assess the learner's speaking level. Then, evaluate the learner's response \
according to The Cambridge English Framework for Young Learners (YLE) and Primary. Present your evaluation in JSON format \
with the following keys: fluency, grammar, vocabulary, content (scores ranging from 1 to 9), simpleEvaluation (a short \
comment on the answer) and question (up to 100 characters for further assessment). \
Respond with the initial question, followed by the JSON evaluation, without any additional text. \
Example response structure: What is your favorite hobby and why do you enjoy it? \
{\"fluency\": 0, \"grammar\": 0, \"vocabulary\": 0, \"content\": 0, \"simpleEvaluation\": \"\", \"question\": \"\"}";

/// The per-mode overrides layered onto the caller's current profile.
fn mode_overrides(mode: &Mode) -> Option<ProfileOverrides> {
    match mode {
        Mode::Chat => Some(ProfileOverrides {
            temperature: Some(0.7),
            max_length: Some(100),
            context_size: Some(ContextSize::Window(5)),
            ..Default::default()
        }),
        Mode::AiTest => Some(ProfileOverrides {
            temperature: Some(0.3),
            max_length: Some(300),
            context_size: Some(ContextSize::Disabled),
            ..Default::default()
        }),
        Mode::Other(_) => None,
    }
}

/// The fixed prompt template bound to each mode.
pub fn template_for(mode: &Mode) -> PromptTemplate {
    match mode {
        Mode::Chat => PromptTemplate {
            style_instructions: "Please respond in written form of 100 characters or less.".to_string(),
            asker_role: "I am the questioner.".to_string(),
            responder_role: "AI is the respondent.".to_string(),
            situational_context: "now".to_string(),
        },
        Mode::AiTest => PromptTemplate {
            style_instructions: AITEST_STYLE.to_string(),
            asker_role: "I am the questioner.".to_string(),
            responder_role: "You are an English teacher.".to_string(),
            situational_context: String::new(),
        },
        Mode::Other(_) => PromptTemplate::default(),
    }
}

/// Resolves modes to profiles, falling back to a fixed default profile.
#[derive(Debug, Clone, Default)]
pub struct SettingsResolver {
    defaults: GenerationProfile,
}

impl SettingsResolver {
    pub fn new(defaults: GenerationProfile) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &GenerationProfile {
        &self.defaults
    }

    /// Returns the profile for `mode`.
    ///
    /// Known modes overlay their overrides onto `current`; unknown modes reset
    /// to the defaults regardless of `current`. The template is always the one
    /// bound to the mode.
    pub fn resolve(&self, current: &GenerationProfile, mode: &Mode) -> GenerationProfile {
        let mut profile = match mode_overrides(mode) {
            Some(overrides) => {
                let mut profile = current.clone();
                overrides.apply_to(&mut profile);
                profile
            }
            None => self.defaults.clone(),
        };
        profile.prompt_template = template_for(mode);

        debug!(
            "Applied settings for {}: temperature={}, max_length={}, top_k={}, top_p={}, context_size={:?}",
            mode.as_str(),
            profile.temperature,
            profile.max_length,
            profile.top_k,
            profile.top_p,
            profile.context_size
        );
        profile
    }

    /// Resolves `mode` from the defaults, then layers the session's own settings
    /// on top. Unknown modes keep the plain defaults.
    pub fn resolve_for_session(&self, settings: &ProfileOverrides, mode: &Mode) -> GenerationProfile {
        let mut profile = self.resolve(&self.defaults, mode);
        if mode_overrides(mode).is_some() {
            settings.apply_to(&mut profile);
        }
        profile
    }
}
