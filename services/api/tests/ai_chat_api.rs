//! Integration tests for the chat API.
//!
//! Each test builds its own router over in-memory stores and a scripted
//! completion backend, then drives it with `oneshot` requests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ai_chat_core::domain::{AssessmentRecord, GenerationProfile};
use ai_chat_core::ports::{
    AssessmentStore, CompletionReply, CompletionRequest, CompletionService, PortError, PortResult,
};
use api_lib::adapters::InMemorySessionStore;
use api_lib::web::protocol::{AiChatResponse, AssessmentResponse, ChatMessage, ProfileResponse};
use api_lib::web::{router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

// =============================================================================
// Helpers
// =============================================================================

const ASSESSMENT_REPLY: &str = "Describe your hometown. {'fluency': 6, 'grammar': 5, \
    'vocabulary': 7, 'content': 6, 'simpleEvaluation': 'Clear answer.', 'question': 'What do you like most about it?'}";

/// Returns queued replies in order; an empty queue means the backend is down.
#[derive(Default)]
struct ScriptedBackend {
    replies: Mutex<Vec<Option<String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    fn with_replies(replies: &[&str]) -> Self {
        let mut queue: Vec<Option<String>> = replies.iter().map(|r| Some(r.to_string())).collect();
        queue.reverse();
        Self {
            replies: Mutex::new(queue),
            ..Default::default()
        }
    }
}

#[async_trait]
impl CompletionService for ScriptedBackend {
    async fn chat(&self, request: CompletionRequest) -> PortResult<CompletionReply> {
        self.requests.lock().unwrap().push(request);
        match self.replies.lock().unwrap().pop() {
            Some(content) => Ok(CompletionReply { content }),
            None => Err(PortError::BackendRequest("connection refused".to_string())),
        }
    }
}

#[derive(Default)]
struct MemoryAssessments {
    broken: bool,
    records: Mutex<Vec<AssessmentRecord>>,
}

#[async_trait]
impl AssessmentStore for MemoryAssessments {
    async fn save_assessment(&self, record: AssessmentRecord) -> PortResult<()> {
        if self.broken {
            return Err(PortError::Storage("database is down".to_string()));
        }
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    async fn get_assessments_for_user(&self, user_id: &str) -> PortResult<Vec<AssessmentRecord>> {
        let records = self.records.lock().unwrap();
        Ok(records.iter().filter(|r| r.user_id == user_id).cloned().collect())
    }
}

fn make_app(backend: Arc<ScriptedBackend>, assessments: Arc<MemoryAssessments>) -> Router {
    let state = AppState::new(
        backend,
        assessments,
        Arc::new(InMemorySessionStore::new()),
        GenerationProfile::default(),
        Duration::from_secs(5),
    );
    router(Arc::new(state))
}

fn chat_request(cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::post("/api/aiChat").header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn message(menu: &str, content: &str) -> serde_json::Value {
    serde_json::json!({
        "menu": menu,
        "messages": [{"role": "user", "content": content}],
    })
}

async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `name=value` part of the response's Set-Cookie header.
fn issued_cookie(resp: &axum::response::Response) -> String {
    let value = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    value.split(';').next().unwrap().to_string()
}

// =============================================================================
// Chat mode
// =============================================================================

#[tokio::test]
async fn test_chat_reply_is_returned_and_remembered() {
    let backend = Arc::new(ScriptedBackend::with_replies(&["Hi! How can I help?"]));
    let app = make_app(backend.clone(), Arc::default());

    let resp = app
        .clone()
        .oneshot(chat_request(None, message("chat", "hello")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = issued_cookie(&resp);
    let reply: AiChatResponse = body_json(resp).await;
    assert_eq!(reply, AiChatResponse::content("Hi! How can I help?".to_string()));

    let resp = app
        .oneshot(
            Request::get("/api/aiChat/history")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let history: Vec<ChatMessage> = body_json(resp).await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].role, "assistant");
    assert_eq!(history[0].content, "Hi! How can I help?");
}

#[tokio::test]
async fn test_second_chat_turn_sends_previous_reply() {
    let backend = Arc::new(ScriptedBackend::with_replies(&["first", "second"]));
    let app = make_app(backend.clone(), Arc::default());

    let resp = app
        .clone()
        .oneshot(chat_request(None, message("chat", "one")))
        .await
        .unwrap();
    let cookie = issued_cookie(&resp);
    app.oneshot(chat_request(Some(&cookie), message("chat", "two")))
        .await
        .unwrap();

    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[1].messages.len(), 2);
    assert_eq!(requests[1].messages[0].content, "first");
    assert!(requests[1].messages[1].content.ends_with(" | two"));
}

#[tokio::test]
async fn test_existing_session_cookie_is_not_reissued() {
    let backend = Arc::new(ScriptedBackend::with_replies(&["ok"]));
    let app = make_app(backend, Arc::default());

    let resp = app
        .oneshot(chat_request(Some("session=known-id"), message("chat", "hi")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
}

// =============================================================================
// Assessment mode
// =============================================================================

#[tokio::test]
async fn test_assessment_turn_replies_and_stores_result() {
    let backend = Arc::new(ScriptedBackend::with_replies(&[ASSESSMENT_REPLY]));
    let assessments = Arc::new(MemoryAssessments::default());
    let app = make_app(backend, assessments.clone());

    let mut body = message("aitest", "I live in a small town by the sea.");
    body["topic_id"] = serde_json::json!(4);
    let mut request = chat_request(None, body);
    request
        .headers_mut()
        .insert("x-user-id", "frank".parse().unwrap());

    let resp = app.clone().oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = issued_cookie(&resp);
    let reply: AiChatResponse = body_json(resp).await;
    assert_eq!(reply.content, "Clear answer. What do you like most about it?");
    assert_eq!(reply.error, None);

    {
        let records = assessments.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "frank");
        assert_eq!(records[0].topic_id, "4");
        assert_eq!(records[0].vocabulary, Some(7));
    }

    let resp = app
        .oneshot(
            Request::get("/api/aitest/results")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let results: Vec<AssessmentResponse> = body_json(resp).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].simple_evaluation, "Clear answer.");
}

#[tokio::test]
async fn test_assessment_without_user_uses_sentinels() {
    let backend = Arc::new(ScriptedBackend::with_replies(&[ASSESSMENT_REPLY]));
    let assessments = Arc::new(MemoryAssessments::default());
    let app = make_app(backend, assessments.clone());

    app.oneshot(chat_request(None, message("aitest", "answer")))
        .await
        .unwrap();

    let records = assessments.records.lock().unwrap();
    assert_eq!(records[0].user_id, "test_user");
    assert_eq!(records[0].topic_id, "1");
}

#[tokio::test]
async fn test_assessment_storage_failure_still_replies() {
    let backend = Arc::new(ScriptedBackend::with_replies(&[ASSESSMENT_REPLY]));
    let assessments = Arc::new(MemoryAssessments {
        broken: true,
        ..Default::default()
    });
    let app = make_app(backend, assessments);

    let resp = app
        .oneshot(chat_request(None, message("aitest", "answer")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let reply: AiChatResponse = body_json(resp).await;
    assert_eq!(reply.content, "Clear answer. What do you like most about it?");
    assert_eq!(reply.error, None);
}

#[tokio::test]
async fn test_unparseable_assessment_is_a_server_error() {
    let backend = Arc::new(ScriptedBackend::with_replies(&["I can't score that."]));
    let app = make_app(backend, Arc::default());

    let resp = app
        .oneshot(chat_request(None, message("aitest", "answer")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let reply: AiChatResponse = body_json(resp).await;
    assert_eq!(reply.content, "");
    assert_eq!(
        reply.error.as_deref(),
        Some("An error occurred while parsing the AI response.")
    );
}

// =============================================================================
// Failures and validation
// =============================================================================

#[tokio::test]
async fn test_backend_failure_is_a_server_error() {
    let backend = Arc::new(ScriptedBackend::default());
    let app = make_app(backend, Arc::default());

    let resp = app
        .oneshot(chat_request(None, message("chat", "hello")))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let reply: AiChatResponse = body_json(resp).await;
    assert_eq!(reply.content, "");
    assert!(reply.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_empty_messages_is_a_bad_request() {
    let backend = Arc::new(ScriptedBackend::with_replies(&["unused"]));
    let app = make_app(backend.clone(), Arc::default());

    let resp = app
        .oneshot(chat_request(None, serde_json::json!({"menu": "chat", "messages": []})))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let reply: AiChatResponse = body_json(resp).await;
    assert_eq!(reply.content, "");
    assert!(reply.error.is_some());
    assert!(backend.requests.lock().unwrap().is_empty());
}

// =============================================================================
// Settings and history
// =============================================================================

#[tokio::test]
async fn test_settings_apply_to_following_chat_turns() {
    let backend = Arc::new(ScriptedBackend::with_replies(&["first", "second"]));
    let app = make_app(backend.clone(), Arc::default());

    let resp = app
        .clone()
        .oneshot(
            Request::patch("/api/settings")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"top_k": 12, "temperature": 0.2, "context_size": 0}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let cookie = issued_cookie(&resp);
    let profile: ProfileResponse = body_json(resp).await;
    assert_eq!(profile.top_k, 12);
    assert_eq!(profile.context_size, 0);
    assert_eq!(profile.top_p, 0.85);

    for text in ["one", "two"] {
        let resp = app
            .clone()
            .oneshot(chat_request(Some(&cookie), message("chat", text)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    let requests = backend.requests.lock().unwrap();
    assert_eq!(requests[0].options.top_k, 12);
    assert_eq!(requests[0].options.temperature, 0.2);
    // Memory is off, so the earlier reply is not sent back.
    assert_eq!(requests[1].messages.len(), 1);
    assert!(requests[1].messages[0].content.ends_with(" | two"));
}

#[tokio::test]
async fn test_out_of_range_settings_are_rejected() {
    let app = make_app(Arc::default(), Arc::default());

    let resp = app
        .oneshot(
            Request::patch("/api/settings")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"top_p": 1.5}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clearing_history() {
    let backend = Arc::new(ScriptedBackend::with_replies(&["remember me"]));
    let app = make_app(backend, Arc::default());

    let resp = app
        .clone()
        .oneshot(chat_request(None, message("chat", "hello")))
        .await
        .unwrap();
    let cookie = issued_cookie(&resp);

    let resp = app
        .clone()
        .oneshot(
            Request::delete("/api/aiChat/history")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .oneshot(
            Request::get("/api/aiChat/history")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let history: Vec<ChatMessage> = body_json(resp).await;
    assert!(history.is_empty());
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = make_app(Arc::default(), Arc::default());

    let resp = app
        .oneshot(
            Request::get("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let doc: serde_json::Value = body_json(resp).await;
    assert!(doc["paths"]["/api/aiChat"]["post"].is_object());
}

#[tokio::test]
async fn test_cors_preflight_allows_user_header() {
    let app = make_app(Arc::default(), Arc::default())
        .layer(api_lib::web::cors_layer("http://localhost:3000".parse().unwrap()));

    let resp = app
        .oneshot(
            Request::options("/api/aitest/results")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-user-id")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let allowed = resp.headers()[header::ACCESS_CONTROL_ALLOW_HEADERS]
        .to_str()
        .unwrap()
        .to_ascii_lowercase();
    assert!(allowed.contains("x-user-id"));
    assert_eq!(
        resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}
