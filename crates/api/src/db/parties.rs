//! Party query builders.

use sea_query::{
    Asterisk, Cond, Expr, Func, Order, Query, SelectStatement, SqliteQueryBuilder,
};

use super::tables::{Invitations, Parties, Users};
use super::Built;

/// Base party select joined with the creator.
///
/// Row order: id, title, platform, description, scheduled_at, creator_id,
/// creator_username, created_at, updated_at.
fn party_select() -> SelectStatement {
    Query::select()
        .column((Parties::Table, Parties::Id))
        .column((Parties::Table, Parties::Title))
        .column((Parties::Table, Parties::Platform))
        .column((Parties::Table, Parties::Description))
        .column((Parties::Table, Parties::ScheduledAt))
        .column((Parties::Table, Parties::CreatorId))
        .column((Users::Table, Users::Username))
        .column((Parties::Table, Parties::CreatedAt))
        .column((Parties::Table, Parties::UpdatedAt))
        .from(Parties::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id)).equals((Parties::Table, Parties::CreatorId)),
        )
        .to_owned()
}

/// Get a single party by id.
pub fn get(party_id: &str) -> Built {
    party_select()
        .and_where(Expr::col((Parties::Table, Parties::Id)).eq(party_id))
        .build(SqliteQueryBuilder)
}

/// All parties, soonest first.
pub fn list_all() -> Built {
    party_select()
        .order_by((Parties::Table, Parties::ScheduledAt), Order::Asc)
        .order_by((Parties::Table, Parties::Id), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Parties `user_id` created or has an accepted invitation to, soonest first.
pub fn list_for_user(user_id: &str) -> Built {
    let attending = Query::select()
        .column(Invitations::PartyId)
        .from(Invitations::Table)
        .and_where(Expr::col(Invitations::UserId).eq(user_id))
        .and_where(Expr::col(Invitations::Status).eq("accepted"))
        .to_owned();

    party_select()
        .cond_where(
            Cond::any()
                .add(Expr::col((Parties::Table, Parties::CreatorId)).eq(user_id))
                .add(Expr::col((Parties::Table, Parties::Id)).in_subquery(attending)),
        )
        .order_by((Parties::Table, Parties::ScheduledAt), Order::Asc)
        .order_by((Parties::Table, Parties::Id), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Insert a party. `scheduled_at` is in the DB timestamp layout.
pub fn insert(
    id: &str,
    title: &str,
    platform: &str,
    description: &str,
    scheduled_at: &str,
    creator_id: &str,
) -> Built {
    Query::insert()
        .into_table(Parties::Table)
        .columns([
            Parties::Id,
            Parties::Title,
            Parties::Platform,
            Parties::Description,
            Parties::ScheduledAt,
            Parties::CreatorId,
        ])
        .values_panic([
            id.into(),
            title.into(),
            platform.into(),
            description.into(),
            scheduled_at.into(),
            creator_id.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Overwrite the editable fields of a party.
///
/// When `reschedule` is set the reminder bookkeeping is cleared so the
/// reminder job fires again for the new time.
pub fn update(
    party_id: &str,
    title: &str,
    platform: &str,
    description: &str,
    scheduled_at: &str,
    reschedule: bool,
) -> Built {
    let mut stmt = Query::update();
    stmt.table(Parties::Table)
        .value(Parties::Title, title)
        .value(Parties::Platform, platform)
        .value(Parties::Description, description)
        .value(Parties::ScheduledAt, scheduled_at)
        .value(Parties::UpdatedAt, Expr::cust("datetime('now')"));
    if reschedule {
        stmt.value(Parties::ReminderSentFor, Option::<String>::None);
    }
    stmt.and_where(Expr::col(Parties::Id).eq(party_id))
        .build(SqliteQueryBuilder)
}

/// Delete a party. Invitations cascade.
pub fn delete(party_id: &str) -> Built {
    Query::delete()
        .from_table(Parties::Table)
        .and_where(Expr::col(Parties::Id).eq(party_id))
        .build(SqliteQueryBuilder)
}

/// Number of parties created by `user_id`.
pub fn count_created_by(user_id: &str) -> Built {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Parties::Table)
        .and_where(Expr::col(Parties::CreatorId).eq(user_id))
        .build(SqliteQueryBuilder)
}

// ── Reminders ──────────────────────────────────────────────────────────────

/// Parties scheduled in `(after, until]` whose current schedule has not
/// been reminded yet.
///
/// Row order: id, title, platform, description, scheduled_at.
pub fn due_for_reminder(after: &str, until: &str) -> Built {
    Query::select()
        .columns([
            Parties::Id,
            Parties::Title,
            Parties::Platform,
            Parties::Description,
            Parties::ScheduledAt,
        ])
        .from(Parties::Table)
        .and_where(Expr::col(Parties::ScheduledAt).gt(after))
        .and_where(Expr::col(Parties::ScheduledAt).lte(until))
        .cond_where(
            Cond::any()
                .add(Expr::col(Parties::ReminderSentFor).is_null())
                .add(Expr::col(Parties::ReminderSentFor).ne(Expr::col(Parties::ScheduledAt))),
        )
        .order_by(Parties::ScheduledAt, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Record that the reminder for `scheduled_at` went out.
pub fn mark_reminded(party_id: &str, scheduled_at: &str) -> Built {
    Query::update()
        .table(Parties::Table)
        .value(Parties::ReminderSentFor, scheduled_at)
        .and_where(Expr::col(Parties::Id).eq(party_id))
        .build(SqliteQueryBuilder)
}
