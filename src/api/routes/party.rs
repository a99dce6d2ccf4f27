use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::api::middleware::UserSession;
use crate::api::routes::{party_error, ApiError};
use crate::api::AppState;
use crate::domain::entities::{PartyDetail, PartySummary};
use crate::domain::error::PartyError;
use crate::domain::value_objects::{BuffsPatch, ProfileInput};
use crate::infrastructure::stores::MemberPatch;

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePartyRequest {
    pub profile: ProfileInput,
    pub title: Option<String>,
    pub passcode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPartyRequest {
    pub party_id: String,
    pub profile: ProfileInput,
    pub passcode: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejoinRequest {
    pub party_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetMemberRequest {
    pub member_id: String,
}

#[derive(Debug, Deserialize)]
pub struct TitleRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct LockRequest {
    pub enabled: bool,
    pub passcode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyMembershipResponse {
    pub party: PartyDetail,
    pub member_id: String,
}

#[derive(Debug, Serialize)]
pub struct PartyResponse {
    pub party: PartyDetail,
}

#[derive(Debug, Serialize)]
pub struct LeaveResponse {
    pub party: Option<PartyDetail>,
}

#[derive(Debug, Serialize)]
pub struct ListPartiesResponse {
    pub parties: Vec<PartySummary>,
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/parties - live parties, most recently active first
pub async fn list_parties(State(state): State<Arc<AppState>>) -> Json<ListPartiesResponse> {
    Json(ListPartiesResponse {
        parties: state.party_store.list_parties(),
    })
}

/// POST /api/party/create
pub async fn create_party(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Json(body): Json<CreatePartyRequest>,
) -> (StatusCode, Json<PartyMembershipResponse>) {
    let (party, member_id) = state.party_store.create_party(
        &body.profile,
        body.title.as_deref(),
        body.passcode.as_deref(),
        Some(&session.user.id),
    );
    state.broadcaster.party_updated(&party);

    (
        StatusCode::CREATED,
        Json(PartyMembershipResponse {
            party: party.detail(),
            member_id,
        }),
    )
}

/// POST /api/party/join
pub async fn join_party(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Json(body): Json<JoinPartyRequest>,
) -> Result<Json<PartyMembershipResponse>, ApiError> {
    let (party, member_id) = state
        .party_store
        .join_party(
            &body.party_id,
            &body.profile,
            body.passcode.as_deref(),
            Some(&session.user.id),
        )
        .map_err(party_error)?;
    state.broadcaster.party_updated(&party);

    Ok(Json(PartyMembershipResponse {
        party: party.detail(),
        member_id,
    }))
}

/// POST /api/party/rejoin - reclaim membership after a reload
pub async fn rejoin_party(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Json(body): Json<RejoinRequest>,
) -> Result<Json<PartyMembershipResponse>, ApiError> {
    let party = state
        .party_store
        .rejoin(&body.party_id, &session.user.id)
        .ok_or_else(|| party_error(PartyError::PartyNotFound))?;
    state.broadcaster.party_updated(&party);

    Ok(Json(PartyMembershipResponse {
        party: party.detail(),
        member_id: session.user.id.clone(),
    }))
}

/// POST /api/party/:partyId/ping - keep-alive; broadcasts nothing
pub async fn ping(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(party_id): Path<String>,
) -> Result<Json<PartyResponse>, ApiError> {
    let party = state
        .party_store
        .ping(&party_id, &session.user.id)
        .ok_or_else(|| party_error(PartyError::PartyNotFound))?;

    Ok(Json(PartyResponse {
        party: party.detail(),
    }))
}

/// POST /api/party/:partyId/leave
pub async fn leave_party(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(party_id): Path<String>,
) -> Json<LeaveResponse> {
    match state.party_store.remove_member(&party_id, &session.user.id) {
        Some(party) => {
            state.broadcaster.party_updated(&party);
            Json(LeaveResponse {
                party: Some(party.detail()),
            })
        }
        None => {
            // Party emptied (or already gone); either way it no longer lists
            state.broadcaster.party_removed(&party_id);
            Json(LeaveResponse { party: None })
        }
    }
}

/// POST /api/party/:partyId/kick - owner removes a member
pub async fn kick_member(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(party_id): Path<String>,
    Json(body): Json<TargetMemberRequest>,
) -> Result<Json<PartyResponse>, ApiError> {
    let party = state
        .party_store
        .kick(&party_id, &session.user.id, &body.member_id)
        .map_err(party_error)?;

    // Tell the kicked client first so it can drop out before the roster
    // update lands
    state.broadcaster.member_kicked(&party_id, &body.member_id);
    state.broadcaster.party_updated(&party);

    Ok(Json(PartyResponse {
        party: party.detail(),
    }))
}

/// POST /api/party/:partyId/transfer-owner
pub async fn transfer_owner(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(party_id): Path<String>,
    Json(body): Json<TargetMemberRequest>,
) -> Result<Json<PartyResponse>, ApiError> {
    let party = state
        .party_store
        .transfer_owner(&party_id, &session.user.id, &body.member_id)
        .map_err(party_error)?;
    state.broadcaster.party_updated(&party);

    Ok(Json(PartyResponse {
        party: party.detail(),
    }))
}

/// PATCH /api/party/:partyId/buffs - owner-only shared counters
pub async fn update_buffs(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(party_id): Path<String>,
    Json(patch): Json<BuffsPatch>,
) -> Result<Json<PartyResponse>, ApiError> {
    let party = state
        .party_store
        .update_buffs(&party_id, &session.user.id, &patch)
        .map_err(party_error)?;
    state.broadcaster.party_updated(&party);

    Ok(Json(PartyResponse {
        party: party.detail(),
    }))
}

/// PATCH /api/party/:partyId/members/:memberId - update a member's profile
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Path((party_id, member_id)): Path<(String, String)>,
    Json(patch): Json<MemberPatch>,
) -> Result<Json<PartyResponse>, ApiError> {
    let party = state
        .party_store
        .update_member(&party_id, &member_id, &patch)
        .ok_or_else(|| party_error(PartyError::PartyNotFound))?;
    state.broadcaster.party_updated(&party);

    Ok(Json(PartyResponse {
        party: party.detail(),
    }))
}

/// PATCH /api/party/:partyId/title - owner-only rename
pub async fn update_title(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(party_id): Path<String>,
    Json(body): Json<TitleRequest>,
) -> Result<Json<PartyResponse>, ApiError> {
    let party = state
        .party_store
        .update_title(&party_id, &session.user.id, &body.title)
        .map_err(party_error)?;
    state.broadcaster.party_updated(&party);

    Ok(Json(PartyResponse {
        party: party.detail(),
    }))
}

/// PATCH /api/party/:partyId/lock - owner toggles the passcode gate
pub async fn set_lock(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<UserSession>,
    Path(party_id): Path<String>,
    Json(body): Json<LockRequest>,
) -> Result<Json<PartyResponse>, ApiError> {
    let party = state
        .party_store
        .set_lock(
            &party_id,
            &session.user.id,
            body.enabled,
            body.passcode.as_deref(),
        )
        .map_err(party_error)?;
    state.broadcaster.party_updated(&party);

    Ok(Json(PartyResponse {
        party: party.detail(),
    }))
}
