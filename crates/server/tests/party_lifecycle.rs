use partyplanner_api::access::Actor;
use partyplanner_api::{
    CreatePartyRequest, InvitationOrigin, InvitationStatus, ServiceError, UpdatePartyRequest,
    UserRole,
};
use partyplanner_server::service::parties;
use partyplanner_server::service::users::{self, NewUser, ProfileUpdate};
use partyplanner_server::storage::Db;

fn setup() -> Db {
    Db::open_in_memory().unwrap()
}

/// Insert a user with a placeholder hash (no PBKDF2 in these tests).
fn add_user(db: &Db, username: &str, role: UserRole) -> Actor {
    let new = NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: "00".to_string(),
        password_salt: "00".to_string(),
        is_admin: role.is_admin(),
    };
    let user = db.transact(|conn| users::insert_user(conn, &new)).unwrap();
    Actor::new(user.id, role)
}

fn party_request(title: &str) -> CreatePartyRequest {
    CreatePartyRequest {
        title: title.to_string(),
        platform: "Foundry VTT".to_string(),
        scheduled_at: "2030-06-01T19:00:00Z".to_string(),
        ..Default::default()
    }
}

fn create_party(db: &Db, actor: &Actor, title: &str) -> String {
    let (party, _) = db
        .transact(|conn| parties::create_party(conn, actor, &party_request(title)))
        .unwrap();
    party.id
}

fn invitation_rows(db: &Db, party_id: &str) -> i64 {
    db.conn()
        .query_row(
            "SELECT COUNT(*) FROM invitations WHERE party_id = ?1",
            [party_id],
            |row| row.get(0),
        )
        .unwrap()
}

#[test]
fn invite_accept_then_delete_party() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);
    let party_id = create_party(&db, &alice, "Lost Mine of Phandelver");

    let (invitation, outbox) = db
        .transact(|conn| parties::invite(conn, &alice, &party_id, "Bob@Example.com"))
        .unwrap();
    assert_eq!(invitation.status, InvitationStatus::Pending);
    assert_eq!(invitation.origin, InvitationOrigin::Invite);
    assert_eq!(invitation.user_id, bob.user_id);
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, "bob@example.com");
    assert!(outbox[0].body.contains("alice has invited you"));

    let (accepted, outbox) = db
        .transact(|conn| parties::respond_to_invite(conn, &bob, &party_id, true))
        .unwrap();
    assert_eq!(accepted.status, InvitationStatus::Accepted);
    assert!(accepted.responded_at.is_some());
    assert_eq!(outbox[0].to, "alice@example.com");
    assert!(outbox[0].body.contains("bob has accepted"));

    let party = db.transact(|conn| parties::get_party(conn, &party_id)).unwrap();
    assert_eq!(party.creator.id, alice.user_id);
    assert_eq!(party.attendees.len(), 1);
    assert_eq!(party.attendees[0].username, "bob");

    db.transact(|conn| parties::delete_party(conn, &alice, &party_id))
        .unwrap();
    assert_eq!(invitation_rows(&db, &party_id), 0);
    let err = db
        .transact(|conn| parties::get_party(conn, &party_id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
    let mine = db
        .transact(|conn| parties::list_my_invitations(conn, &bob, None))
        .unwrap();
    assert!(mine.is_empty());
}

#[test]
fn only_the_creator_updates_or_deletes() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);
    let admin = add_user(&db, "root", UserRole::Admin);
    let party_id = create_party(&db, &alice, "One-shot");

    let update = UpdatePartyRequest {
        title: Some("Hijacked".into()),
        ..Default::default()
    };
    for actor in [&bob, &admin] {
        let err = db
            .transact(|conn| parties::update_party(conn, actor, &party_id, &update))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
        let err = db
            .transact(|conn| parties::delete_party(conn, actor, &party_id))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    let party = db.transact(|conn| parties::get_party(conn, &party_id)).unwrap();
    assert_eq!(party.title, "One-shot");
}

#[test]
fn missing_party_is_not_found_before_permission() {
    let db = setup();
    let bob = add_user(&db, "bob", UserRole::Regular);
    let err = db
        .transact(|conn| parties::delete_party(conn, &bob, "does-not-exist"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test]
fn partial_update_keeps_other_fields() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let party_id = create_party(&db, &alice, "Campaign night");

    let update = UpdatePartyRequest {
        description: Some("  Bring dice  ".into()),
        scheduled_at: Some("2030-06-02 20:30".into()),
        ..Default::default()
    };
    let party = db
        .transact(|conn| parties::update_party(conn, &alice, &party_id, &update))
        .unwrap();
    assert_eq!(party.title, "Campaign night");
    assert_eq!(party.platform, "Foundry VTT");
    assert_eq!(party.description, "Bring dice");
    assert_eq!(party.scheduled_at.to_rfc3339(), "2030-06-02T20:30:00+00:00");

    let bad = UpdatePartyRequest {
        title: Some("   ".into()),
        ..Default::default()
    };
    let err = db
        .transact(|conn| parties::update_party(conn, &alice, &party_id, &bad))
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[test]
fn invalid_schedule_is_rejected() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let mut req = party_request("Bad date");
    req.scheduled_at = "next friday".into();
    let err = db
        .transact(|conn| parties::create_party(conn, &alice, &req))
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));
}

#[test]
fn duplicate_invitation_is_conflict() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);
    let party_id = create_party(&db, &alice, "Dupes");

    db.transact(|conn| parties::invite(conn, &alice, &party_id, "bob@example.com"))
        .unwrap();
    let err = db
        .transact(|conn| parties::invite(conn, &alice, &party_id, "bob@example.com"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // An invitation also blocks a join request for the same pair.
    let err = db
        .transact(|conn| parties::request_to_join(conn, &bob, &party_id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
    assert_eq!(invitation_rows(&db, &party_id), 1);
}

#[test]
fn invite_rejects_self_and_unknown_addresses() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);
    let party_id = create_party(&db, &alice, "Guests");

    let err = db
        .transact(|conn| parties::invite(conn, &alice, &party_id, "ghost@example.com"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = db
        .transact(|conn| parties::invite(conn, &alice, &party_id, "alice@example.com"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let err = db
        .transact(|conn| parties::invite(conn, &bob, &party_id, "alice@example.com"))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[test]
fn answered_invitation_never_changes() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);
    let party_id = create_party(&db, &alice, "Final answer");
    db.transact(|conn| parties::invite(conn, &alice, &party_id, "bob@example.com"))
        .unwrap();

    let (declined, _) = db
        .transact(|conn| parties::respond_to_invite(conn, &bob, &party_id, false))
        .unwrap();
    assert_eq!(declined.status, InvitationStatus::Declined);

    for accept in [true, false] {
        let err = db
            .transact(|conn| parties::respond_to_invite(conn, &bob, &party_id, accept))
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    let party = db.transact(|conn| parties::get_party(conn, &party_id)).unwrap();
    assert!(party.attendees.is_empty());
}

#[test]
fn responding_without_invitation_is_not_found() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let carol = add_user(&db, "carol", UserRole::Regular);
    let party_id = create_party(&db, &alice, "Closed table");

    let err = db
        .transact(|conn| parties::respond_to_invite(conn, &carol, &party_id, true))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test]
fn create_invites_registered_addresses_once() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);

    let mut req = party_request("Open table");
    req.invite_emails = vec![
        "BOB@example.com".into(),
        "bob@example.com".into(),
        "alice@example.com".into(),
        "ghost@example.com".into(),
    ];
    let (party, outbox) = db
        .transact(|conn| parties::create_party(conn, &alice, &req))
        .unwrap();
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].to, "bob@example.com");
    assert_eq!(invitation_rows(&db, &party.id), 1);

    let pending = db
        .transact(|conn| {
            parties::list_my_invitations(conn, &bob, Some(InvitationStatus::Pending))
        })
        .unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].party_title, "Open table");
    assert_eq!(pending[0].creator_username, "alice");

    let accepted = db
        .transact(|conn| {
            parties::list_my_invitations(conn, &bob, Some(InvitationStatus::Accepted))
        })
        .unwrap();
    assert!(accepted.is_empty());
}

#[test]
fn join_request_reviewed_by_creator() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);
    let carol = add_user(&db, "carol", UserRole::Regular);
    let party_id = create_party(&db, &alice, "Drop-in");

    let err = db
        .transact(|conn| parties::request_to_join(conn, &alice, &party_id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::BadRequest(_)));

    let (request, outbox) = db
        .transact(|conn| parties::request_to_join(conn, &bob, &party_id))
        .unwrap();
    assert_eq!(request.origin, InvitationOrigin::JoinRequest);
    assert_eq!(request.status, InvitationStatus::Pending);
    assert_eq!(outbox[0].to, "alice@example.com");
    assert!(outbox[0].body.contains("bob has requested to join"));

    // The requester cannot approve their own request.
    let err = db
        .transact(|conn| parties::respond_to_invite(conn, &bob, &party_id, true))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let err = db
        .transact(|conn| {
            parties::review_join_request(conn, &carol, &party_id, &bob.user_id, true)
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let (reviewed, outbox) = db
        .transact(|conn| {
            parties::review_join_request(conn, &alice, &party_id, &bob.user_id, true)
        })
        .unwrap();
    assert_eq!(reviewed.status, InvitationStatus::Accepted);
    assert_eq!(outbox[0].to, "bob@example.com");
    assert!(outbox[0].subject.starts_with("Join request accepted"));

    let err = db
        .transact(|conn| {
            parties::review_join_request(conn, &alice, &party_id, &bob.user_id, false)
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let err = db
        .transact(|conn| {
            parties::review_join_request(conn, &alice, &party_id, &carol.user_id, true)
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test]
fn remove_attendee_by_creator_or_self() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);
    let carol = add_user(&db, "carol", UserRole::Regular);
    let party_id = create_party(&db, &alice, "Revolving door");

    for email in ["bob@example.com", "carol@example.com"] {
        db.transact(|conn| parties::invite(conn, &alice, &party_id, email))
            .unwrap();
    }
    db.transact(|conn| parties::respond_to_invite(conn, &bob, &party_id, true))
        .unwrap();

    let err = db
        .transact(|conn| parties::remove_attendee(conn, &carol, &party_id, &bob.user_id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    db.transact(|conn| parties::remove_attendee(conn, &bob, &party_id, &bob.user_id))
        .unwrap();
    let err = db
        .transact(|conn| parties::remove_attendee(conn, &bob, &party_id, &bob.user_id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Pending invitations can be withdrawn too.
    db.transact(|conn| parties::remove_attendee(conn, &alice, &party_id, &carol.user_id))
        .unwrap();
    assert_eq!(invitation_rows(&db, &party_id), 0);
}

#[test]
fn mine_filter_lists_created_and_attended() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);
    let first = create_party(&db, &alice, "First");
    create_party(&db, &alice, "Second");
    let own = create_party(&db, &bob, "Bob's table");

    let all = db
        .transact(|conn| parties::list_parties(conn, &bob, false))
        .unwrap();
    assert_eq!(all.len(), 3);

    let mine = db
        .transact(|conn| parties::list_parties(conn, &bob, true))
        .unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].id, own);

    db.transact(|conn| parties::invite(conn, &alice, &first, "bob@example.com"))
        .unwrap();
    let mine = db
        .transact(|conn| parties::list_parties(conn, &bob, true))
        .unwrap();
    assert_eq!(mine.len(), 1, "pending invitations do not count");

    db.transact(|conn| parties::respond_to_invite(conn, &bob, &first, true))
        .unwrap();
    let mine = db
        .transact(|conn| parties::list_parties(conn, &bob, true))
        .unwrap();
    assert_eq!(mine.len(), 2);
}

#[test]
fn user_owning_parties_cannot_be_deleted() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);
    let party_id = create_party(&db, &alice, "Anchor");
    db.transact(|conn| parties::invite(conn, &alice, &party_id, "bob@example.com"))
        .unwrap();

    let err = db
        .transact(|conn| users::delete_user(conn, &alice.user_id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Deleting the invitee removes the invitation with them.
    db.transact(|conn| users::delete_user(conn, &bob.user_id))
        .unwrap();
    assert_eq!(invitation_rows(&db, &party_id), 0);

    db.transact(|conn| parties::delete_party(conn, &alice, &party_id))
        .unwrap();
    db.transact(|conn| users::delete_user(conn, &alice.user_id))
        .unwrap();
    let err = db
        .transact(|conn| users::get_user(conn, &alice.user_id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[test]
fn admin_lists_and_deletes_users() {
    let db = setup();
    let alice = add_user(&db, "alice", UserRole::Regular);
    let admin = add_user(&db, "root", UserRole::Admin);

    let err = db
        .transact(|conn| users::list_users(conn, &alice))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    let listed = db.transact(|conn| users::list_users(conn, &admin)).unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.iter().any(|u| u.username == "root" && u.is_admin));

    let err = db
        .transact(|conn| users::admin_delete_user(conn, &alice, &admin.user_id))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    db.transact(|conn| users::admin_delete_user(conn, &admin, &alice.user_id))
        .unwrap();
    assert_eq!(
        db.transact(|conn| users::list_users(conn, &admin)).unwrap().len(),
        1
    );
}

#[test]
fn profile_update_checks_uniqueness() {
    let db = setup();
    add_user(&db, "alice", UserRole::Regular);
    let bob = add_user(&db, "bob", UserRole::Regular);

    let taken = ProfileUpdate {
        email: Some("alice@example.com".into()),
        ..Default::default()
    };
    let err = db
        .transact(|conn| users::update_user(conn, &bob.user_id, &taken))
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));

    let rename = ProfileUpdate {
        username: Some("robert".into()),
        ..Default::default()
    };
    let updated = db
        .transact(|conn| users::update_user(conn, &bob.user_id, &rename))
        .unwrap();
    assert_eq!(updated.username, "robert");
    assert_eq!(updated.email, "bob@example.com");
}

#[test]
fn signup_conflicts_on_taken_email_or_username() {
    let db = setup();
    add_user(&db, "alice", UserRole::Regular);

    let same_email = NewUser {
        username: "alice2".into(),
        email: "alice@example.com".into(),
        password_hash: "00".into(),
        password_salt: "00".into(),
        is_admin: false,
    };
    let err = db
        .transact(|conn| users::insert_user(conn, &same_email))
        .unwrap_err();
    assert_eq!(err, ServiceError::Conflict("email already registered".into()));

    let same_name = NewUser {
        email: "other@example.com".into(),
        username: "alice".into(),
        ..same_email
    };
    let err = db
        .transact(|conn| users::insert_user(conn, &same_name))
        .unwrap_err();
    assert_eq!(err, ServiceError::Conflict("username already taken".into()));
}
