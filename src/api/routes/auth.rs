use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::middleware::{UserSession, SESSION_COOKIE};
use crate::api::routes::{ApiError, ErrorBody};
use crate::api::AppState;
use crate::infrastructure::auth::DiscordUser;

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user: DiscordUser,
}

/// GET /auth/discord - send the browser to Discord's consent screen
pub async fn discord_login(State(state): State<Arc<AppState>>) -> Result<Redirect, ApiError> {
    let url = state.oauth.authorize_url().map_err(|err| {
        warn!(error = %err, "discord login unavailable");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorBody {
                error: "OAUTH_NOT_CONFIGURED",
                message: err.to_string(),
            }),
        )
    })?;
    Ok(Redirect::temporary(&url))
}

/// GET /auth/discord/callback - redeem the code, mint a session, set the
/// cookie, and bounce back to the frontend.
pub async fn discord_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let web_origin = state.config.web_origin.clone();

    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Redirect::temporary(&format!("{}/?login=denied", web_origin)).into_response();
    };

    let user = match state.oauth.exchange_code(&code).await {
        Ok(user) => user,
        Err(err) => {
            warn!(error = %err, "discord code exchange failed");
            return Redirect::temporary(&format!("{}/?login=failed", web_origin)).into_response();
        }
    };

    info!(user_id = %user.id, username = %user.username, "user logged in");
    let session = state.sessions.create(user);
    let cookie = session_cookie(&session.token, state.config.session_ttl.as_secs());

    (
        [(header::SET_COOKIE, cookie)],
        Redirect::temporary(&web_origin),
    )
        .into_response()
}

/// GET /api/me - identity behind the session cookie
pub async fn me(Extension(session): Extension<UserSession>) -> Json<MeResponse> {
    Json(MeResponse { user: session.user })
}

/// POST /api/logout - revoke the session and clear the cookie
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Response {
    state.sessions.remove(&session.token);
    (
        [(header::SET_COOKIE, session_cookie("", 0))],
        Json(serde_json::json!({ "success": true })),
    )
        .into_response()
}

/// Cross-site cookie so the frontend can live on another origin.
fn session_cookie(token: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=None; Secure",
        SESSION_COOKIE, token, max_age_secs
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_is_http_only_and_cross_site() {
        let cookie = session_cookie("tok", 3600);
        assert!(cookie.starts_with("lfg_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn logout_cookie_expires_immediately() {
        let cookie = session_cookie("", 0);
        assert!(cookie.contains("Max-Age=0"));
    }
}
