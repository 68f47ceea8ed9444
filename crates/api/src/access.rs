//! Capability checks for every party operation.
//!
//! Handlers resolve the acting user and the party's creator, then ask this
//! module whether the action is allowed. Nothing here touches storage.

use crate::{ServiceError, UserRole};

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub role: UserRole,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Something an actor may want to do to a party.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyCapability<'a> {
    Update,
    Delete,
    Invite,
    ReviewJoinRequest,
    /// Answer an invitation addressed to `invitee`.
    Respond { invitee: &'a str },
    RequestToJoin,
    /// Drop `target` from the party.
    RemoveAttendee { target: &'a str },
}

/// Check `capability` for `actor` on a party created by `creator_id`.
pub fn authorize_party(
    actor: &Actor,
    creator_id: &str,
    capability: PartyCapability<'_>,
) -> Result<(), ServiceError> {
    let is_creator = actor.is(creator_id);
    match capability {
        PartyCapability::Update
        | PartyCapability::Delete
        | PartyCapability::Invite
        | PartyCapability::ReviewJoinRequest => {
            if is_creator {
                Ok(())
            } else {
                Err(ServiceError::Forbidden("party creator only".into()))
            }
        }
        PartyCapability::Respond { invitee } => {
            if actor.is(invitee) {
                Ok(())
            } else {
                Err(ServiceError::Forbidden("only the invitee may respond".into()))
            }
        }
        PartyCapability::RequestToJoin => {
            if is_creator {
                Err(ServiceError::BadRequest(
                    "cannot request to join your own party".into(),
                ))
            } else {
                Ok(())
            }
        }
        PartyCapability::RemoveAttendee { target } => {
            if is_creator || actor.is(target) {
                Ok(())
            } else {
                Err(ServiceError::Forbidden(
                    "only the party creator or the attendee may remove an attendee".into(),
                ))
            }
        }
    }
}

/// Admin-only operations (user listing and deletion).
pub fn require_admin(actor: &Actor) -> Result<(), ServiceError> {
    if actor.role.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden("admin access required".into()))
    }
}
