use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::infrastructure::app_state::AppState;

// Re-exported so handlers can extract it from request extensions
pub use crate::infrastructure::services::UserSession;

/// Name of the session cookie set by the OAuth callback
pub const SESSION_COOKIE: &str = "lfg_session";

/// Pull the session token out of the Cookie header, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE && !value.is_empty()).then(|| value.to_string())
    })
}

/// Resolve the session cookie to a live session; 401 otherwise.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, Response> {
    let session = session_token(request.headers())
        .and_then(|token| state.sessions.get(&token))
        .ok_or_else(unauthorized)?;

    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "UNAUTHORIZED",
            "message": "Login required"
        })),
    )
        .into_response()
}
