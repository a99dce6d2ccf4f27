use std::sync::Arc;

use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::api::middleware::UserSession;
use crate::api::AppState;
use crate::domain::value_objects::{PlayerProfile, ProfileInput};

#[derive(Serialize)]
pub struct ProfileResponse {
    pub profile: Option<PlayerProfile>,
}

/// GET /api/profile - the caller's saved character, if any
pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        profile: state.profile_store.get(&session.user.id),
    })
}

/// PUT /api/profile - save (and sanitize) the caller's character
pub async fn put_profile(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Json(input): Json<ProfileInput>,
) -> Json<ProfileResponse> {
    let profile = state.profile_store.set(&session.user.id, &input);
    Json(ProfileResponse {
        profile: Some(profile),
    })
}
