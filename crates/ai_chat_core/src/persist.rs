//! crates/ai_chat_core/src/persist.rs
//!
//! Turns a parsed assessment into a stored record. Storage failures are
//! reported as an outcome, never as an error.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{AssessmentRecord, ParsedAssessment, Score};
use crate::ports::AssessmentStore;

pub const FALLBACK_USER_ID: &str = "test_user";
pub const FALLBACK_TOPIC_ID: &str = "1";

/// What happened to the assessment record of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Saved(Uuid),
    Failed,
}

impl PersistOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistOutcome::Saved(_))
    }
}

#[derive(Clone)]
pub struct ResultPersister {
    store: Arc<dyn AssessmentStore>,
}

impl ResultPersister {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self { store }
    }

    /// Writes one record for `parsed`.
    pub async fn persist(
        &self,
        user_id: Option<&str>,
        topic_id: Option<&str>,
        parsed: &ParsedAssessment,
    ) -> PersistOutcome {
        let record = build_record(user_id, topic_id, parsed);
        let record_id = record.record_id;
        info!(
            "Saving assessment {} for user {} on topic {}",
            record_id, record.user_id, record.topic_id
        );

        match self.store.save_assessment(record).await {
            Ok(()) => {
                info!("Assessment {} saved successfully.", record_id);
                PersistOutcome::Saved(record_id)
            }
            Err(e) => {
                error!("Failed to save assessment {}: {}", record_id, e);
                PersistOutcome::Failed
            }
        }
    }
}

/// Applies the sentinel ids and stamps a fresh id and the current time.
pub fn build_record(
    user_id: Option<&str>,
    topic_id: Option<&str>,
    parsed: &ParsedAssessment,
) -> AssessmentRecord {
    let user_id = match user_id {
        Some(id) if !id.is_empty() => id,
        _ => FALLBACK_USER_ID,
    };

    AssessmentRecord {
        record_id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        topic_id: topic_id.unwrap_or(FALLBACK_TOPIC_ID).to_string(),
        timestamp: Utc::now(),
        fluency: stored_score("fluency", &parsed.fluency),
        grammar: stored_score("grammar", &parsed.grammar),
        vocabulary: stored_score("vocabulary", &parsed.vocabulary),
        content: stored_score("content", &parsed.content),
        evaluation_text: parsed.evaluation_text.clone(),
    }
}

/// Fractional scores are rounded half away from zero; non-numeric ones become NULL.
fn stored_score(name: &str, score: &Score) -> Option<i64> {
    let value = match score {
        Score::Points(points) => return Some(*points),
        Score::Raw(value) => value,
    };
    match value.as_f64() {
        Some(number) if number.is_finite() => {
            let rounded = number.round() as i64;
            warn!("Fractional {} score {} will be stored as {}", name, number, rounded);
            Some(rounded)
        }
        _ => {
            warn!("Non-numeric {} score {} will be stored as NULL", name, value);
            None
        }
    }
}
