//! services/api/src/adapters/ollama_llm.rs
//!
//! This module contains the adapter for an Ollama chat server.
//! It implements the `CompletionService` port from the `core` crate by calling
//! the native `/api/chat` endpoint with `reqwest`.

use ai_chat_core::ports::{CompletionReply, CompletionRequest, CompletionService, PortError, PortResult};
use async_trait::async_trait;
use bytes::BytesMut;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
    options: WireOptions,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct WireOptions {
    temperature: f32,
    max_length: u32,
    top_k: u32,
    top_p: f32,
}

/// One reply object; a non-streamed reply is a single one of these.
#[derive(Deserialize)]
struct ChatChunk {
    message: Option<ChunkMessage>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

#[derive(Deserialize)]
struct ChunkMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CompletionService` against an Ollama server.
#[derive(Clone)]
pub struct OllamaChatAdapter {
    client: Client,
    chat_url: String,
    model: String,
}

impl OllamaChatAdapter {
    /// Creates a new `OllamaChatAdapter` for the server at `base_url`.
    pub fn new(base_url: &str, model: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
            model,
        })
    }
}

//=========================================================================================
// `CompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CompletionService for OllamaChatAdapter {
    async fn chat(&self, request: CompletionRequest) -> PortResult<CompletionReply> {
        let body = ChatBody {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|turn| WireMessage {
                    role: turn.role.as_str(),
                    content: &turn.content,
                })
                .collect(),
            stream: request.stream,
            options: WireOptions {
                temperature: request.options.temperature,
                max_length: request.options.max_length,
                top_k: request.options.top_k,
                top_p: request.options.top_p,
            },
        };

        let response = self
            .client
            .post(&self.chat_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::BackendRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(PortError::BackendResponse(describe_failure(status, &text)));
        }

        let mut accumulator = ReplyAccumulator::default();
        if request.stream {
            let mut chunks = response.bytes_stream();
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk.map_err(|e| PortError::BackendRequest(e.to_string()))?;
                accumulator.feed(&chunk)?;
            }
        } else {
            let body = response
                .bytes()
                .await
                .map_err(|e| PortError::BackendRequest(e.to_string()))?;
            accumulator.feed(&body)?;
        }
        accumulator.finish()
    }
}

//=========================================================================================
// Reply Decoding
//=========================================================================================

/// Collects message content from newline-delimited JSON reply objects.
///
/// A non-streamed reply is the degenerate case of a single object without a
/// trailing newline.
#[derive(Default)]
struct ReplyAccumulator {
    buffer: BytesMut,
    content: Option<String>,
    done: bool,
}

impl ReplyAccumulator {
    fn feed(&mut self, bytes: &[u8]) -> PortResult<()> {
        self.buffer.extend_from_slice(bytes);
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos + 1);
            self.apply_line(&line)?;
        }
        Ok(())
    }

    fn finish(mut self) -> PortResult<CompletionReply> {
        let rest = self.buffer.split();
        self.apply_line(&rest)?;
        debug!("Completion finished (done flag: {})", self.done);
        Ok(CompletionReply {
            content: self.content,
        })
    }

    fn apply_line(&mut self, line: &[u8]) -> PortResult<()> {
        let line = String::from_utf8_lossy(line);
        let line = line.trim();
        if line.is_empty() || self.done {
            return Ok(());
        }

        let chunk: ChatChunk = serde_json::from_str(line)
            .map_err(|e| PortError::BackendResponse(format!("Unreadable reply: {}", e)))?;
        if let Some(error) = chunk.error {
            return Err(PortError::BackendResponse(error));
        }
        if let Some(text) = chunk.message.and_then(|m| m.content) {
            self.content.get_or_insert_with(String::new).push_str(&text);
        }
        self.done = chunk.done;
        Ok(())
    }
}

fn describe_failure(status: StatusCode, body: &str) -> String {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string());
    format!("{}: {}", status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_reply_object() {
        let mut acc = ReplyAccumulator::default();
        acc.feed(br#"{"model":"llama3","message":{"role":"assistant","content":"Hi!"},"done":true}"#)
            .unwrap();

        assert_eq!(acc.finish().unwrap().content.as_deref(), Some("Hi!"));
    }

    #[test]
    fn test_streamed_chunks_split_across_reads() {
        let mut acc = ReplyAccumulator::default();
        acc.feed(b"{\"message\":{\"content\":\"Hel\"},\"done\":false}\n{\"mess").unwrap();
        acc.feed(b"age\":{\"content\":\"lo\"},\"done\":false}\n").unwrap();
        acc.feed(b"{\"message\":{\"content\":\"\"},\"done\":true}\n").unwrap();

        assert_eq!(acc.finish().unwrap().content.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_reply_without_message_has_no_content() {
        let mut acc = ReplyAccumulator::default();
        acc.feed(br#"{"done":true}"#).unwrap();

        assert_eq!(acc.finish().unwrap(), CompletionReply { content: None });
    }

    #[test]
    fn test_inline_error_is_a_response_error() {
        let mut acc = ReplyAccumulator::default();
        let err = acc.feed(b"{\"error\":\"model 'llama3' not found\"}\n").unwrap_err();

        assert!(matches!(err, PortError::BackendResponse(m) if m.contains("not found")));
    }

    #[test]
    fn test_garbage_is_a_response_error() {
        let mut acc = ReplyAccumulator::default();
        acc.feed(b"<html>").unwrap();

        assert!(matches!(acc.finish(), Err(PortError::BackendResponse(_))));
    }

    #[test]
    fn test_describe_failure_prefers_error_field() {
        assert_eq!(
            describe_failure(StatusCode::NOT_FOUND, r#"{"error":"model not found"}"#),
            "404 Not Found: model not found"
        );
        assert_eq!(
            describe_failure(StatusCode::BAD_GATEWAY, " upstream down \n"),
            "502 Bad Gateway: upstream down"
        );
    }

    #[test]
    fn test_chat_url_is_normalised() {
        let adapter =
            OllamaChatAdapter::new("http://localhost:11434/", "llama3".into(), Duration::from_secs(5))
                .unwrap();
        assert_eq!(adapter.chat_url, "http://localhost:11434/api/chat");
    }
}
