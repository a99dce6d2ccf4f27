pub mod auth;
pub mod health;
pub mod party;
pub mod profile;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Serialize;

use crate::api::middleware::auth_middleware;
use crate::api::sse;
use crate::api::AppState;
use crate::domain::error::PartyError;

/// Error body shared by every failing handler: the stable code plus a
/// human-readable message.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub(crate) fn party_error(err: PartyError) -> ApiError {
    let status = match err {
        PartyError::PartyNotFound | PartyError::NotFound => StatusCode::NOT_FOUND,
        PartyError::Forbidden => StatusCode::FORBIDDEN,
        _ => StatusCode::CONFLICT,
    };
    (
        status,
        Json(ErrorBody {
            error: err.code(),
            message: err.to_string(),
        }),
    )
}

/// Build the full application router. Shared by `main` and the integration
/// tests so both exercise identical routing and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    // Everything under /api except the SSE stream sits behind the session
    // cookie; the stream itself is public so the lobby can render pre-login.
    let api = Router::new()
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
        .route(
            "/profile",
            get(profile::get_profile).put(profile::put_profile),
        )
        .route("/parties", get(party::list_parties))
        .route("/party/create", post(party::create_party))
        .route("/party/join", post(party::join_party))
        .route("/party/rejoin", post(party::rejoin_party))
        .route("/party/:partyId/ping", post(party::ping))
        .route("/party/:partyId/leave", post(party::leave_party))
        .route("/party/:partyId/kick", post(party::kick_member))
        .route("/party/:partyId/transfer-owner", post(party::transfer_owner))
        .route("/party/:partyId/buffs", patch(party::update_buffs))
        .route(
            "/party/:partyId/members/:memberId",
            patch(party::update_member),
        )
        .route("/party/:partyId/title", patch(party::update_title))
        .route("/party/:partyId/lock", patch(party::set_lock))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .route("/events", get(sse::sse_handler));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/auth/discord", get(auth::discord_login))
        .route("/auth/discord/callback", get(auth::discord_callback))
        .nest("/api", api)
        .with_state(state)
}
