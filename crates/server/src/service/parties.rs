use partyplanner_api::access::{self, Actor, PartyCapability};
use partyplanner_api::{
    db, service, CreatePartyRequest, InvitationOrigin, InvitationResponse, InvitationStatus,
    MyInvitation, PartyResponse, ServiceError, ServiceResult, UpdatePartyRequest, UserSummary,
};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use super::users::{find_by_email, get_user};
use super::Outbox;
use crate::mail;
use crate::storage::{
    invitation_from_row, is_constraint_violation, my_invitation_from_row, party_from_row,
    sq_execute, sq_query_map, sq_query_row, PartyRow,
};

// ── Loading ────────────────────────────────────────────────────────────────

fn load_party(conn: &Connection, party_id: &str) -> ServiceResult<PartyRow> {
    sq_query_row(conn, db::parties::get(party_id), party_from_row)
        .optional()
        .map_err(ServiceError::from_db("get party"))?
        .ok_or_else(|| ServiceError::NotFound("party not found".into()))
}

fn attendees(conn: &Connection, party_id: &str) -> ServiceResult<Vec<UserSummary>> {
    sq_query_map(conn, db::invitations::attendees(party_id), |row| {
        Ok(UserSummary {
            id: row.get(0)?,
            username: row.get(1)?,
        })
    })
    .map_err(ServiceError::from_db("list attendees"))
}

fn assemble(conn: &Connection, row: PartyRow) -> ServiceResult<PartyResponse> {
    let attendees = attendees(conn, &row.id)?;
    Ok(PartyResponse {
        id: row.id,
        title: row.title,
        platform: row.platform,
        description: row.description,
        scheduled_at: row.scheduled_at,
        creator: row.creator,
        attendees,
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

fn find_invitation(
    conn: &Connection,
    party_id: &str,
    user_id: &str,
) -> ServiceResult<Option<InvitationResponse>> {
    sq_query_row(conn, db::invitations::lookup(party_id, user_id), invitation_from_row)
        .optional()
        .map_err(ServiceError::from_db("lookup invitation"))
}

/// Insert a pending invitation and read it back.
fn create_invitation(
    conn: &Connection,
    party_id: &str,
    user_id: &str,
    origin: InvitationOrigin,
) -> ServiceResult<InvitationResponse> {
    if find_invitation(conn, party_id, user_id)?.is_some() {
        let msg = match origin {
            InvitationOrigin::Invite => "user already has an invitation to this party",
            InvitationOrigin::JoinRequest => {
                "you already have an invitation or join request for this party"
            }
        };
        return Err(ServiceError::Conflict(msg.into()));
    }

    let id = Uuid::new_v4().to_string();
    sq_execute(
        conn,
        db::invitations::insert(&id, party_id, user_id, origin.as_str()),
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            ServiceError::Conflict("invitation already exists".into())
        } else {
            ServiceError::from_db("insert invitation")(e)
        }
    })?;

    find_invitation(conn, party_id, user_id)?
        .ok_or_else(|| ServiceError::Internal("invitation vanished after insert".into()))
}

/// Move a pending invitation to accepted/declined.
fn answer(
    conn: &Connection,
    invitation: &InvitationResponse,
    accept: bool,
) -> ServiceResult<InvitationResponse> {
    let next = invitation.status.respond(accept)?;
    let changed = sq_execute(conn, db::invitations::respond(&invitation.id, next.as_str()))
        .map_err(ServiceError::from_db("respond to invitation"))?;
    if changed == 0 {
        return Err(ServiceError::Conflict("invitation already answered".into()));
    }
    find_invitation(conn, &invitation.party_id, &invitation.user_id)?
        .ok_or_else(|| ServiceError::NotFound("invitation not found".into()))
}

// ── Parties ────────────────────────────────────────────────────────────────

/// All parties, or only those the actor created or attends.
pub fn list_parties(
    conn: &Connection,
    actor: &Actor,
    mine: bool,
) -> ServiceResult<Vec<PartyResponse>> {
    let query = if mine {
        db::parties::list_for_user(&actor.user_id)
    } else {
        db::parties::list_all()
    };
    let rows = sq_query_map(conn, query, party_from_row)
        .map_err(ServiceError::from_db("list parties"))?;
    rows.into_iter().map(|row| assemble(conn, row)).collect()
}

pub fn get_party(conn: &Connection, party_id: &str) -> ServiceResult<PartyResponse> {
    let row = load_party(conn, party_id)?;
    assemble(conn, row)
}

/// Create a party owned by the actor and invite `invite_emails`.
///
/// The creator's own address and addresses without an account are skipped.
pub fn create_party(
    conn: &Connection,
    actor: &Actor,
    req: &CreatePartyRequest,
) -> ServiceResult<(PartyResponse, Outbox)> {
    let title = service::validate_title(&req.title)?;
    let platform = service::validate_platform(&req.platform)?;
    let description = service::validate_description(&req.description)?;
    let scheduled_at = service::parse_schedule(&req.scheduled_at)?;
    let invite_emails = service::normalize_invite_emails(&req.invite_emails)?;
    let creator = get_user(conn, &actor.user_id)?;

    let party_id = Uuid::new_v4().to_string();
    sq_execute(
        conn,
        db::parties::insert(
            &party_id,
            &title,
            &platform,
            &description,
            &service::to_db_timestamp(&scheduled_at),
            &actor.user_id,
        ),
    )
    .map_err(ServiceError::from_db("insert party"))?;

    let mut outbox = Outbox::new();
    for email in &invite_emails {
        if *email == creator.email {
            continue;
        }
        let Some(invitee) = find_by_email(conn, email)? else {
            tracing::debug!("skipping invite for unregistered address {email}");
            continue;
        };
        create_invitation(conn, &party_id, &invitee.id, InvitationOrigin::Invite)?;
        outbox.push(mail::invitation(
            &invitee.email,
            &creator.username,
            &title,
            &platform,
            &scheduled_at,
        ));
    }

    tracing::info!(
        "party created: {title} ({party_id}) by {}, {} invited",
        creator.username,
        outbox.len()
    );
    Ok((get_party(conn, &party_id)?, outbox))
}

/// Creator only. A new `scheduled_at` re-arms the reminder.
pub fn update_party(
    conn: &Connection,
    actor: &Actor,
    party_id: &str,
    req: &UpdatePartyRequest,
) -> ServiceResult<PartyResponse> {
    let current = load_party(conn, party_id)?;
    access::authorize_party(actor, &current.creator.id, PartyCapability::Update)?;

    let title = match &req.title {
        Some(title) => service::validate_title(title)?,
        None => current.title,
    };
    let platform = match &req.platform {
        Some(platform) => service::validate_platform(platform)?,
        None => current.platform,
    };
    let description = match &req.description {
        Some(description) => service::validate_description(description)?,
        None => current.description,
    };
    let scheduled_at = match &req.scheduled_at {
        Some(raw) => service::parse_schedule(raw)?,
        None => current.scheduled_at,
    };
    let stored_at = service::to_db_timestamp(&scheduled_at);
    let rescheduled = stored_at != service::to_db_timestamp(&current.scheduled_at);

    sq_execute(
        conn,
        db::parties::update(
            party_id,
            &title,
            &platform,
            &description,
            &stored_at,
            rescheduled,
        ),
    )
    .map_err(ServiceError::from_db("update party"))?;

    get_party(conn, party_id)
}

/// Creator only. Invitations go with the party.
pub fn delete_party(conn: &Connection, actor: &Actor, party_id: &str) -> ServiceResult<()> {
    let party = load_party(conn, party_id)?;
    access::authorize_party(actor, &party.creator.id, PartyCapability::Delete)?;

    sq_execute(conn, db::parties::delete(party_id))
        .map_err(ServiceError::from_db("delete party"))?;
    tracing::info!("party deleted: {} ({party_id})", party.title);
    Ok(())
}

// ── Invitations ────────────────────────────────────────────────────────────

/// Creator only: invite a registered user by email.
pub fn invite(
    conn: &Connection,
    actor: &Actor,
    party_id: &str,
    email: &str,
) -> ServiceResult<(InvitationResponse, Outbox)> {
    let party = load_party(conn, party_id)?;
    access::authorize_party(actor, &party.creator.id, PartyCapability::Invite)?;

    let email = service::validate_email(email)?;
    let invitee = find_by_email(conn, &email)?
        .ok_or_else(|| ServiceError::NotFound("no user registered with that email".into()))?;
    if actor.is(&invitee.id) {
        return Err(ServiceError::BadRequest("cannot invite yourself".into()));
    }

    let invitation = create_invitation(conn, party_id, &invitee.id, InvitationOrigin::Invite)?;
    let outbox = vec![mail::invitation(
        &invitee.email,
        &party.creator.username,
        &party.title,
        &party.platform,
        &party.scheduled_at,
    )];
    Ok((invitation, outbox))
}

/// The invitee accepts or declines an invitation from the creator.
pub fn respond_to_invite(
    conn: &Connection,
    actor: &Actor,
    party_id: &str,
    accept: bool,
) -> ServiceResult<(InvitationResponse, Outbox)> {
    let party = load_party(conn, party_id)?;
    let invitation = find_invitation(conn, party_id, &actor.user_id)?
        .filter(|inv| inv.origin == InvitationOrigin::Invite)
        .ok_or_else(|| ServiceError::NotFound("invitation not found".into()))?;
    access::authorize_party(
        actor,
        &party.creator.id,
        PartyCapability::Respond {
            invitee: &invitation.user_id,
        },
    )?;

    let updated = answer(conn, &invitation, accept)?;
    let invitee = get_user(conn, &actor.user_id)?;
    let creator = get_user(conn, &party.creator.id)?;
    let outbox = vec![mail::invite_response(
        &creator.email,
        &invitee.username,
        &party.title,
        accept,
    )];
    Ok((updated, outbox))
}

/// Any user but the creator asks to be let in.
pub fn request_to_join(
    conn: &Connection,
    actor: &Actor,
    party_id: &str,
) -> ServiceResult<(InvitationResponse, Outbox)> {
    let party = load_party(conn, party_id)?;
    access::authorize_party(actor, &party.creator.id, PartyCapability::RequestToJoin)?;

    let invitation =
        create_invitation(conn, party_id, &actor.user_id, InvitationOrigin::JoinRequest)?;
    let requester = get_user(conn, &actor.user_id)?;
    let creator = get_user(conn, &party.creator.id)?;
    let outbox = vec![mail::join_request(
        &creator.email,
        &requester.username,
        &party.title,
    )];
    Ok((invitation, outbox))
}

/// Creator only: accept or decline a pending join request.
pub fn review_join_request(
    conn: &Connection,
    actor: &Actor,
    party_id: &str,
    requester_id: &str,
    accept: bool,
) -> ServiceResult<(InvitationResponse, Outbox)> {
    let party = load_party(conn, party_id)?;
    access::authorize_party(actor, &party.creator.id, PartyCapability::ReviewJoinRequest)?;

    let request = find_invitation(conn, party_id, requester_id)?
        .filter(|inv| inv.origin == InvitationOrigin::JoinRequest)
        .ok_or_else(|| ServiceError::NotFound("join request not found".into()))?;

    let updated = answer(conn, &request, accept)?;
    let requester = get_user(conn, requester_id)?;
    let outbox = vec![mail::join_review(&requester.email, &party.title, accept)];
    Ok((updated, outbox))
}

/// Drop a user's invitation, whatever its state. The creator may remove
/// anyone; everybody else only themselves.
pub fn remove_attendee(
    conn: &Connection,
    actor: &Actor,
    party_id: &str,
    user_id: &str,
) -> ServiceResult<()> {
    let party = load_party(conn, party_id)?;
    access::authorize_party(
        actor,
        &party.creator.id,
        PartyCapability::RemoveAttendee { target: user_id },
    )?;

    let removed = sq_execute(conn, db::invitations::delete(party_id, user_id))
        .map_err(ServiceError::from_db("remove attendee"))?;
    if removed == 0 {
        return Err(ServiceError::NotFound("invitation not found".into()));
    }
    Ok(())
}

/// Invitations addressed to the actor, optionally filtered by status.
pub fn list_my_invitations(
    conn: &Connection,
    actor: &Actor,
    status: Option<InvitationStatus>,
) -> ServiceResult<Vec<MyInvitation>> {
    sq_query_map(
        conn,
        db::invitations::list_for_user(&actor.user_id, status.as_ref().map(|s| s.as_str())),
        my_invitation_from_row,
    )
    .map_err(ServiceError::from_db("list invitations"))
}
