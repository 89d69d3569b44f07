//! crates/ai_chat_core/src/extract.rs
//!
//! Pulls the scored evaluation out of a free-text assessment reply.
//!
//! The model is asked to answer with a question followed by a JSON object. In
//! practice the object is often single-quoted and the text may carry invisible
//! characters, so the reply is cleaned up before decoding.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::domain::{ParsedAssessment, Score};

static INVISIBLE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{200B}-\u{200D}\u{FEFF}]").expect("Invalid invisible-char regex"));

/// Greedy: first `{` through the last `}`. Not nesting-aware.
static JSON_SPAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{[\s\S]*\}").expect("Invalid JSON span regex"));

/// The reply did not contain a decodable evaluation object.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MalformedResponseError {
    #[error("No JSON object found between the first '{{' and the last '}}' of the response")]
    NoJsonObject,
    #[error("Invalid JSON in response: {0}")]
    InvalidJson(String),
    #[error("Expected a JSON object in response, found {0}")]
    NotAnObject(&'static str),
}

/// Extracts a [`ParsedAssessment`] from a raw model reply.
pub fn extract(raw_text: &str) -> Result<ParsedAssessment, MalformedResponseError> {
    let cleaned = INVISIBLE_CHARS.replace_all(raw_text, "");
    let cleaned = cleaned.trim();

    let span = JSON_SPAN
        .find(cleaned)
        .ok_or(MalformedResponseError::NoJsonObject)?
        .as_str();

    let value = decode_span(span)?;
    let Value::Object(fields) = value else {
        return Err(MalformedResponseError::NotAnObject(json_type_name(&value)));
    };

    Ok(from_fields(&fields))
}

/// Swaps every single quote for a double quote, then decodes.
///
/// Known limitation: any value containing an apostrophe no longer decodes.
fn decode_span(span: &str) -> Result<Value, MalformedResponseError> {
    serde_json::from_str::<Value>(&span.replace('\'', "\""))
        .map_err(|e| MalformedResponseError::InvalidJson(e.to_string()))
}

fn from_fields(fields: &Map<String, Value>) -> ParsedAssessment {
    let defaults = ParsedAssessment::default();
    ParsedAssessment {
        fluency: score_field(fields, "fluency"),
        grammar: score_field(fields, "grammar"),
        vocabulary: score_field(fields, "vocabulary"),
        content: score_field(fields, "content"),
        evaluation_text: text_field(fields, "simpleEvaluation").unwrap_or(defaults.evaluation_text),
        followup_question: text_field(fields, "question").unwrap_or(defaults.followup_question),
    }
}

fn score_field(fields: &Map<String, Value>, key: &str) -> Score {
    match fields.get(key) {
        None => Score::default(),
        Some(value) => match value.as_i64() {
            Some(points) => Score::Points(points),
            None => Score::Raw(value.clone()),
        },
    }
}

fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).map(|value| match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
