pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;
use tower_http::cors::CorsLayer;
use utoipa_swagger_ui::SwaggerUi;

pub use middleware::{attach_session, USER_ID_HEADER};
pub use rest::{
    ai_chat_handler, clear_history_handler, get_history_handler, list_results_handler,
    update_settings_handler, ApiDoc,
};
pub use state::AppState;

/// Builds the complete application router: the chat API plus its Swagger UI.
pub fn router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route("/api/aiChat", post(ai_chat_handler))
        .route(
            "/api/aiChat/history",
            get(get_history_handler).delete(clear_history_handler),
        )
        .route("/api/settings", patch(update_settings_handler))
        .route("/api/aitest/results", get(list_results_handler))
        .layer(axum_middleware::from_fn(attach_session))
        .with_state(app_state);

    Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// CORS for a browser client served from `allowed_origin`. The session cookie
/// and the user header must both cross origins.
pub fn cors_layer(allowed_origin: HeaderValue) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, ACCEPT, HeaderName::from_static(USER_ID_HEADER)])
}
