use axum::{
    extract::{Path, State},
    Json,
};
use partyplanner_api::{ListUsersResponse, OkResponse};

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::service::users;
use crate::storage::Db;

/// GET /api/admin/users: every account (admin only).
pub async fn list_users(
    State(db): State<Db>,
    user: AuthUser,
) -> Result<Json<ListUsersResponse>, ApiErr> {
    let actor = user.actor();
    let users = db.transact(|conn| users::list_users(conn, &actor))?;
    Ok(Json(ListUsersResponse { users }))
}

/// DELETE /api/admin/users/{id}: delete an account (admin only).
pub async fn delete_user(
    State(db): State<Db>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, ApiErr> {
    let actor = user.actor();
    db.transact(|conn| users::admin_delete_user(conn, &actor, &id))?;
    tracing::info!("admin {} deleted user {id}", user.username);
    Ok(Json(OkResponse { ok: true }))
}
