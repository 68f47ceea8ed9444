use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use partyplanner_api::{
    CreatePartyRequest, InvitationResponse, InviteRequest, ListPartiesResponse, OkResponse,
    PartyListQuery, PartyResponse, RespondRequest, UpdatePartyRequest,
};

use crate::error::ApiErr;
use crate::mail::Notifier;
use crate::routes::auth::AuthUser;
use crate::service::parties;
use crate::storage::Db;

// ---------------------------------------------------------------------------
// Parties
// ---------------------------------------------------------------------------

/// GET /api/parties?mine=
pub async fn list_parties(
    State(db): State<Db>,
    user: AuthUser,
    Query(query): Query<PartyListQuery>,
) -> Result<Json<ListPartiesResponse>, ApiErr> {
    let actor = user.actor();
    let parties = db.transact(|conn| parties::list_parties(conn, &actor, query.mine))?;
    Ok(Json(ListPartiesResponse { parties }))
}

/// POST /api/parties: create a party, optionally inviting users by email.
pub async fn create_party(
    State(db): State<Db>,
    State(notifier): State<Notifier>,
    user: AuthUser,
    Json(req): Json<CreatePartyRequest>,
) -> Result<(StatusCode, Json<PartyResponse>), ApiErr> {
    let actor = user.actor();
    let (party, outbox) = db.transact(|conn| parties::create_party(conn, &actor, &req))?;
    notifier.dispatch(outbox);
    Ok((StatusCode::CREATED, Json(party)))
}

/// GET /api/parties/{id}
pub async fn get_party(
    State(db): State<Db>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<PartyResponse>, ApiErr> {
    Ok(Json(db.transact(|conn| parties::get_party(conn, &id))?))
}

/// PUT /api/parties/{id}: creator only.
pub async fn update_party(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdatePartyRequest>,
) -> Result<Json<PartyResponse>, ApiErr> {
    let actor = user.actor();
    let party = db.transact(|conn| parties::update_party(conn, &actor, &id, &req))?;
    Ok(Json(party))
}

/// DELETE /api/parties/{id}: creator only; invitations go with it.
pub async fn delete_party(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    let actor = user.actor();
    db.transact(|conn| parties::delete_party(conn, &actor, &id))?;
    Ok(Json(OkResponse { ok: true }))
}

// ---------------------------------------------------------------------------
// Invitations and join requests
// ---------------------------------------------------------------------------

/// POST /api/parties/{id}/invitations: creator invites a user by email.
pub async fn invite(
    State(db): State<Db>,
    State(notifier): State<Notifier>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<InviteRequest>,
) -> Result<(StatusCode, Json<InvitationResponse>), ApiErr> {
    let actor = user.actor();
    let (invitation, outbox) =
        db.transact(|conn| parties::invite(conn, &actor, &id, &req.email))?;
    notifier.dispatch(outbox);
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// PUT /api/parties/{id}/respond-invite: invitee accepts or declines.
pub async fn respond_invite(
    State(db): State<Db>,
    State(notifier): State<Notifier>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<InvitationResponse>, ApiErr> {
    let actor = user.actor();
    let (invitation, outbox) =
        db.transact(|conn| parties::respond_to_invite(conn, &actor, &id, req.accept))?;
    notifier.dispatch(outbox);
    Ok(Json(invitation))
}

/// POST /api/parties/{id}/join-request
pub async fn request_to_join(
    State(db): State<Db>,
    State(notifier): State<Notifier>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<InvitationResponse>), ApiErr> {
    let actor = user.actor();
    let (invitation, outbox) = db.transact(|conn| parties::request_to_join(conn, &actor, &id))?;
    notifier.dispatch(outbox);
    Ok((StatusCode::CREATED, Json(invitation)))
}

/// PUT /api/parties/{id}/join-requests/{user_id}: creator reviews a request.
pub async fn review_join_request(
    State(db): State<Db>,
    State(notifier): State<Notifier>,
    user: AuthUser,
    Path((id, requester_id)): Path<(String, String)>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<InvitationResponse>, ApiErr> {
    let actor = user.actor();
    let (invitation, outbox) = db.transact(|conn| {
        parties::review_join_request(conn, &actor, &id, &requester_id, req.accept)
    })?;
    notifier.dispatch(outbox);
    Ok(Json(invitation))
}

/// DELETE /api/parties/{id}/attendees/{user_id}: creator, or the user leaving.
pub async fn remove_attendee(
    State(db): State<Db>,
    user: AuthUser,
    Path((id, target_id)): Path<(String, String)>,
) -> Result<Json<OkResponse>, ApiErr> {
    let actor = user.actor();
    db.transact(|conn| parties::remove_attendee(conn, &actor, &id, &target_id))?;
    Ok(Json(OkResponse { ok: true }))
}
