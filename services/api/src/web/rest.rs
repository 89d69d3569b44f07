//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::{
    middleware::{user_from_headers, SessionId},
    protocol::{
        AiChatRequest, AiChatResponse, AssessmentResponse, ChatMessage, ProfileResponse,
        SettingsUpdate,
    },
    state::AppState,
};
use ai_chat_core::domain::{ChatSession, ContextSize, Mode};
use ai_chat_core::persist::FALLBACK_USER_ID;
use ai_chat_core::turn::{TurnInput, TurnReply};
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    Extension,
};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        ai_chat_handler,
        get_history_handler,
        clear_history_handler,
        update_settings_handler,
        list_results_handler,
    ),
    components(
        schemas(
            AiChatRequest,
            AiChatResponse,
            ChatMessage,
            SettingsUpdate,
            ProfileResponse,
            AssessmentResponse
        )
    ),
    tags(
        (name = "AI Chat API", description = "Free-form chat and spoken-English assessment endpoints.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Helpers
//=========================================================================================

async fn load_session(
    app_state: &AppState,
    session_id: &SessionId,
) -> Result<ChatSession, (StatusCode, String)> {
    app_state.sessions.load_session(&session_id.0).await.map_err(|e| {
        error!("Failed to load session {}: {:?}", session_id.0, e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load session".to_string(),
        )
    })
}

async fn save_session(
    app_state: &AppState,
    session_id: &SessionId,
    session: ChatSession,
) -> Result<(), (StatusCode, String)> {
    app_state
        .sessions
        .save_session(&session_id.0, session)
        .await
        .map_err(|e| {
            error!("Failed to save session {}: {:?}", session_id.0, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save session".to_string(),
            )
        })
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Run one chat or assessment turn.
///
/// The `menu` field selects the mode. In `aitest` mode the model's evaluation is
/// scored, stored, and answered with the evaluation followed by the next question.
#[utoipa::path(
    post,
    path = "/api/aiChat",
    request_body = AiChatRequest,
    responses(
        (status = 200, description = "The assistant's reply", body = AiChatResponse),
        (status = 400, description = "No message to answer", body = AiChatResponse),
        (status = 500, description = "The completion backend failed or its reply could not be parsed", body = AiChatResponse)
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "Binds the session to a user.")
    )
)]
pub async fn ai_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session_id): Extension<SessionId>,
    headers: HeaderMap,
    Json(request): Json<AiChatRequest>,
) -> (StatusCode, Json<AiChatResponse>) {
    let Some(user_message) = request.messages.last().map(|m| m.content.as_str()) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(AiChatResponse::failure("messages must contain at least one message")),
        );
    };
    info!("Received {} request for session {}", request.menu, session_id.0);

    let mut session = match load_session(&app_state, &session_id).await {
        Ok(session) => session,
        Err((status, message)) => return (status, Json(AiChatResponse::failure(message))),
    };
    if let Some(user_id) = user_from_headers(&headers) {
        session.user_id = Some(user_id);
    }

    let input = TurnInput {
        mode: Mode::parse(&request.menu),
        user_message,
        stream: request.stream,
        topic_id: request.topic_id.as_deref(),
    };
    let reply = app_state.orchestrator.handle_turn(&mut session, input).await;

    if let Err((status, message)) = save_session(&app_state, &session_id, session).await {
        return (status, Json(AiChatResponse::failure(message)));
    }

    match reply {
        TurnReply::Content(content) => (StatusCode::OK, Json(AiChatResponse::content(content))),
        TurnReply::Failed { error } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(AiChatResponse::failure(error)),
        ),
    }
}

/// Return the session's remembered conversation, oldest first.
#[utoipa::path(
    get,
    path = "/api/aiChat/history",
    responses(
        (status = 200, description = "The session history", body = [ChatMessage]),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn get_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session_id): Extension<SessionId>,
) -> Result<Json<Vec<ChatMessage>>, (StatusCode, String)> {
    let session = load_session(&app_state, &session_id).await?;
    let messages = session
        .history
        .as_ref()
        .map(|history| history.turns().iter().map(ChatMessage::from).collect())
        .unwrap_or_default();
    Ok(Json(messages))
}

/// Forget the session's conversation.
#[utoipa::path(
    delete,
    path = "/api/aiChat/history",
    responses(
        (status = 204, description = "History cleared"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn clear_history_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session_id): Extension<SessionId>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut session = load_session(&app_state, &session_id).await?;
    session.clear_history();
    save_session(&app_state, &session_id, session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Change the generation settings of this session.
///
/// Values set here win over the per-mode settings of `chat` and `aitest`
/// turns; other modes use the server defaults.
#[utoipa::path(
    patch,
    path = "/api/settings",
    request_body = SettingsUpdate,
    responses(
        (status = 200, description = "The session's updated settings", body = ProfileResponse),
        (status = 400, description = "A value is out of range"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn update_settings_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session_id): Extension<SessionId>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<ProfileResponse>, (StatusCode, String)> {
    if update.temperature.is_some_and(|t| !(t.is_finite() && t >= 0.0)) {
        return Err((
            StatusCode::BAD_REQUEST,
            "temperature must be a non-negative number".to_string(),
        ));
    }
    if update.top_p.is_some_and(|p| !(0.0..=1.0).contains(&p)) {
        return Err((
            StatusCode::BAD_REQUEST,
            "top_p must be between 0 and 1".to_string(),
        ));
    }

    let mut session = load_session(&app_state, &session_id).await?;
    let settings = &mut session.settings;
    settings.temperature = update.temperature.or(settings.temperature);
    settings.max_length = update.max_length.or(settings.max_length);
    settings.top_k = update.top_k.or(settings.top_k);
    settings.top_p = update.top_p.or(settings.top_p);
    settings.context_size = update
        .context_size
        .map(ContextSize::from_raw)
        .or(settings.context_size);

    let mut profile = app_state.default_profile().clone();
    session.settings.apply_to(&mut profile);
    save_session(&app_state, &session_id, session).await?;
    Ok(Json(ProfileResponse::from(&profile)))
}

/// List the stored assessment results of the session's user.
#[utoipa::path(
    get,
    path = "/api/aitest/results",
    responses(
        (status = 200, description = "Assessment results, oldest first", body = [AssessmentResponse]),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = Option<String>, Header, description = "Overrides the session's user.")
    )
)]
pub async fn list_results_handler(
    State(app_state): State<Arc<AppState>>,
    Extension(session_id): Extension<SessionId>,
    headers: HeaderMap,
) -> Result<Json<Vec<AssessmentResponse>>, (StatusCode, String)> {
    let session = load_session(&app_state, &session_id).await?;
    let user_id = user_from_headers(&headers)
        .or(session.user_id)
        .unwrap_or_else(|| FALLBACK_USER_ID.to_string());

    let records = app_state
        .assessments
        .get_assessments_for_user(&user_id)
        .await
        .map_err(|e| {
            error!("Failed to list assessments for {}: {:?}", user_id, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to list assessment results".to_string(),
            )
        })?;

    Ok(Json(records.into_iter().map(AssessmentResponse::from).collect()))
}
