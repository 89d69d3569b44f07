//! services/api/src/web/middleware.rs
//!
//! Session cookie middleware for the chat routes.

use axum::{
    extract::Request,
    http::{header, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "session";
pub const USER_ID_HEADER: &str = "x-user-id";

/// The id of the browser session a request belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionId(pub String);

/// Middleware that resolves the session cookie, issuing a new one when absent.
///
/// The session id is inserted into request extensions for handlers to use.
pub async fn attach_session(mut req: Request, next: Next) -> Response {
    // 1. Parse session ID from the cookie header, if any
    let existing = session_from_headers(req.headers());

    // 2. Issue a fresh ID for new visitors
    let (session_id, issued) = match existing {
        Some(id) => (id, false),
        None => (Uuid::new_v4().to_string(), true),
    };
    if issued {
        debug!("Issuing new chat session {}", session_id);
    }

    // 3. Insert the session ID into request extensions and run the handler
    req.extensions_mut().insert(SessionId(session_id.clone()));
    let mut response = next.run(req).await;

    // 4. Hand the new cookie back
    if issued {
        let cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/",
            SESSION_COOKIE, session_id
        );
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => error!("Failed to build session cookie: {:?}", e),
        }
    }
    response
}

/// Reads the session ID out of the `Cookie` header.
pub fn session_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|c| {
            let c = c.trim();
            c.strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
}

/// The user ID supplied by the client, if any.
pub fn user_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
