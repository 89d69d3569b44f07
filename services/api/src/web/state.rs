//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use ai_chat_core::persist::ResultPersister;
use ai_chat_core::ports::{AssessmentStore, CompletionService, SessionStore};
use ai_chat_core::settings::SettingsResolver;
use ai_chat_core::turn::TurnOrchestrator;
use ai_chat_core::GenerationProfile;
use std::sync::Arc;
use std::time::Duration;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Holds no per-turn generation settings: those are resolved per request.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub assessments: Arc<dyn AssessmentStore>,
    pub orchestrator: TurnOrchestrator,
}

impl AppState {
    /// Wires the turn orchestrator on top of the given ports.
    pub fn new(
        completion: Arc<dyn CompletionService>,
        assessments: Arc<dyn AssessmentStore>,
        sessions: Arc<dyn SessionStore>,
        default_profile: GenerationProfile,
        backend_timeout: Duration,
    ) -> Self {
        let orchestrator = TurnOrchestrator::new(
            completion,
            ResultPersister::new(assessments.clone()),
            SettingsResolver::new(default_profile),
            backend_timeout,
        );
        Self {
            sessions,
            assessments,
            orchestrator,
        }
    }

    /// The profile a session starts from before any setter is applied.
    pub fn default_profile(&self) -> &GenerationProfile {
        self.orchestrator.resolver().defaults()
    }
}
