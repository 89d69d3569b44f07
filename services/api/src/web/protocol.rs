//! services/api/src/web/protocol.rs
//!
//! Defines the JSON payloads exchanged between the browser client and the API server.

use ai_chat_core::domain::{AssessmentRecord, ConversationTurn, GenerationProfile};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

//=========================================================================================
// Chat
//=========================================================================================

/// A message as the client sends and receives it.
#[derive(Serialize, Deserialize, Debug, Clone, ToSchema)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// The body of `POST /api/aiChat`. Only the last message's content is used.
#[derive(Deserialize, Debug, ToSchema)]
pub struct AiChatRequest {
    /// `chat`, `aitest`, or anything else for a plain completion.
    #[serde(default = "default_menu")]
    pub menu: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, deserialize_with = "string_or_number")]
    pub topic_id: Option<String>,
    /// Accepted for compatibility; the server decides which model to use.
    #[serde(default)]
    pub model: Option<String>,
}

fn default_menu() -> String {
    "default".to_string()
}

/// Accepts `"3"` and `3` alike.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Id>::deserialize(deserializer)?.map(|id| match id {
        Id::Text(text) => text,
        Id::Number(number) => number.to_string(),
    }))
}

/// The reply to `POST /api/aiChat`. `error` is only present on failure.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct AiChatResponse {
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AiChatResponse {
    pub fn content(content: String) -> Self {
        Self {
            content,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            content: String::new(),
            error: Some(error.into()),
        }
    }
}

//=========================================================================================
// Settings
//=========================================================================================

/// The body of `PATCH /api/settings`. Absent fields are left unchanged.
#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct SettingsUpdate {
    pub temperature: Option<f32>,
    pub max_length: Option<u32>,
    pub top_k: Option<u32>,
    pub top_p: Option<f32>,
    /// `0` disables memory, negative values remove the limit.
    pub context_size: Option<i64>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, ToSchema)]
pub struct ProfileResponse {
    pub temperature: f32,
    pub max_length: u32,
    pub top_k: u32,
    pub top_p: f32,
    pub context_size: i64,
}

impl From<&GenerationProfile> for ProfileResponse {
    fn from(profile: &GenerationProfile) -> Self {
        Self {
            temperature: profile.temperature,
            max_length: profile.max_length,
            top_k: profile.top_k,
            top_p: profile.top_p,
            context_size: profile.context_size.as_raw(),
        }
    }
}

//=========================================================================================
// Assessment Results
//=========================================================================================

#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct AssessmentResponse {
    pub record_id: Uuid,
    pub user_id: String,
    pub topic_id: String,
    pub chat_date: DateTime<Utc>,
    pub fluency: Option<i64>,
    pub grammar: Option<i64>,
    pub vocabulary: Option<i64>,
    pub content: Option<i64>,
    pub simple_evaluation: String,
}

impl From<AssessmentRecord> for AssessmentResponse {
    fn from(record: AssessmentRecord) -> Self {
        Self {
            record_id: record.record_id,
            user_id: record.user_id,
            topic_id: record.topic_id,
            chat_date: record.timestamp,
            fluency: record.fluency,
            grammar: record.grammar,
            vocabulary: record.vocabulary,
            content: record.content,
            simple_evaluation: record.evaluation_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request: AiChatRequest = serde_json::from_str(r#"{"messages": []}"#).unwrap();
        assert_eq!(request.menu, "default");
        assert!(!request.stream);
        assert_eq!(request.topic_id, None);
    }

    #[test]
    fn test_topic_id_accepts_numbers() {
        let request: AiChatRequest =
            serde_json::from_str(r#"{"menu": "aitest", "messages": [], "topic_id": 12}"#).unwrap();
        assert_eq!(request.topic_id.as_deref(), Some("12"));

        let request: AiChatRequest =
            serde_json::from_str(r#"{"messages": [], "topic_id": "abc"}"#).unwrap();
        assert_eq!(request.topic_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_success_reply_has_no_error_key() {
        let json = serde_json::to_value(AiChatResponse::content("hi".into())).unwrap();
        assert_eq!(json, serde_json::json!({"content": "hi"}));

        let json = serde_json::to_value(AiChatResponse::failure("boom")).unwrap();
        assert_eq!(json, serde_json::json!({"content": "", "error": "boom"}));
    }
}
