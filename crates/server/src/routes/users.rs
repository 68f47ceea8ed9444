use axum::{
    extract::{Path, Query, State},
    Json,
};
use partyplanner_api::{
    InvitationListQuery, ListInvitationsResponse, OkResponse, UpdateUserRequest, UserResponse,
};

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::routes::blocking;
use crate::service::{parties, users};
use crate::storage::Db;

/// GET /api/user/me
pub async fn me(State(db): State<Db>, user: AuthUser) -> Result<Json<UserResponse>, ApiErr> {
    Ok(Json(db.transact(|conn| users::get_user(conn, &user.user_id))?))
}

/// PUT /api/user/me: change username, email and/or password.
pub async fn update_me(
    State(db): State<Db>,
    user: AuthUser,
    Json(req): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiErr> {
    let update = blocking(move || users::ProfileUpdate::from_request(&req)).await?;
    let updated = db.transact(|conn| users::update_user(conn, &user.user_id, &update))?;
    Ok(Json(updated))
}

/// DELETE /api/user/me: delete the caller's account.
pub async fn delete_me(State(db): State<Db>, user: AuthUser) -> Result<Json<OkResponse>, ApiErr> {
    db.transact(|conn| users::delete_user(conn, &user.user_id))?;
    Ok(Json(OkResponse { ok: true }))
}

/// GET /api/user/invitations?status=: invitations addressed to the caller.
pub async fn my_invitations(
    State(db): State<Db>,
    user: AuthUser,
    Query(query): Query<InvitationListQuery>,
) -> Result<Json<ListInvitationsResponse>, ApiErr> {
    let actor = user.actor();
    let invitations =
        db.transact(|conn| parties::list_my_invitations(conn, &actor, query.status))?;
    Ok(Json(ListInvitationsResponse { invitations }))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(db): State<Db>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiErr> {
    Ok(Json(db.transact(|conn| users::get_user(conn, &id))?))
}
