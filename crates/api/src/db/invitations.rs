//! Invitation query builders.

use sea_query::{Expr, Order, Query, SqliteQueryBuilder};

use super::tables::{Invitations, Users};
use super::Built;

/// INSERT a new pending invitation.
pub fn insert(id: &str, party_id: &str, user_id: &str, origin: &str) -> Built {
    Query::insert()
        .into_table(Invitations::Table)
        .columns([
            Invitations::Id,
            Invitations::PartyId,
            Invitations::UserId,
            Invitations::Origin,
        ])
        .values_panic([id.into(), party_id.into(), user_id.into(), origin.into()])
        .build(SqliteQueryBuilder)
}

/// Lookup the invitation linking `user_id` to `party_id`.
///
/// Row order: id, party_id, user_id, status, origin, created_at, responded_at.
pub fn lookup(party_id: &str, user_id: &str) -> Built {
    Query::select()
        .columns([
            Invitations::Id,
            Invitations::PartyId,
            Invitations::UserId,
            Invitations::Status,
            Invitations::Origin,
            Invitations::CreatedAt,
            Invitations::RespondedAt,
        ])
        .from(Invitations::Table)
        .and_where(Expr::col(Invitations::PartyId).eq(party_id))
        .and_where(Expr::col(Invitations::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Move an invitation out of `pending`. The `status = 'pending'` guard makes
/// a second answer a no-op (0 rows affected).
pub fn respond(id: &str, status: &str) -> Built {
    Query::update()
        .table(Invitations::Table)
        .value(Invitations::Status, status)
        .value(Invitations::RespondedAt, Expr::cust("datetime('now')"))
        .and_where(Expr::col(Invitations::Id).eq(id))
        .and_where(Expr::col(Invitations::Status).eq("pending"))
        .build(SqliteQueryBuilder)
}

/// Delete the invitation linking `user_id` to `party_id`.
pub fn delete(party_id: &str, user_id: &str) -> Built {
    Query::delete()
        .from_table(Invitations::Table)
        .and_where(Expr::col(Invitations::PartyId).eq(party_id))
        .and_where(Expr::col(Invitations::UserId).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Accepted attendees of a party (id, username, email), in acceptance order.
pub fn attendees(party_id: &str) -> Built {
    Query::select()
        .column((Users::Table, Users::Id))
        .column((Users::Table, Users::Username))
        .column((Users::Table, Users::Email))
        .from(Invitations::Table)
        .inner_join(
            Users::Table,
            Expr::col((Users::Table, Users::Id)).equals((Invitations::Table, Invitations::UserId)),
        )
        .and_where(Expr::col((Invitations::Table, Invitations::PartyId)).eq(party_id))
        .and_where(Expr::col((Invitations::Table, Invitations::Status)).eq("accepted"))
        .order_by((Invitations::Table, Invitations::RespondedAt), Order::Asc)
        .order_by((Users::Table, Users::Username), Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Invitations addressed to a user, joined with party and creator.
///
/// Row order: id, party_id, party_title, platform, scheduled_at,
/// creator_username, status, origin, created_at, responded_at.
pub fn list_for_user(user_id: &str, status: Option<&str>) -> Built {
    // Joins users twice (invitee filter, creator name); kept as raw SQL
    let mut sql = concat!(
        "SELECT ",
        "i.\"id\", i.\"party_id\", p.\"title\", p.\"platform\", p.\"scheduled_at\", ",
        "c.\"username\" AS \"creator_username\", i.\"status\", i.\"origin\", ",
        "i.\"created_at\", i.\"responded_at\" ",
        "FROM \"invitations\" i ",
        "INNER JOIN \"parties\" p ON p.\"id\" = i.\"party_id\" ",
        "INNER JOIN \"users\" c ON c.\"id\" = p.\"creator_id\" ",
        "WHERE i.\"user_id\" = ? ",
    )
    .to_string();
    let mut values: Vec<sea_query::Value> = vec![user_id.into()];
    if let Some(status) = status {
        sql.push_str("AND i.\"status\" = ? ");
        values.push(status.into());
    }
    sql.push_str("ORDER BY p.\"scheduled_at\" ASC, i.\"id\" ASC");
    (sql, sea_query::Values(values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respond_only_touches_pending_rows() {
        let (sql, values) = respond("i1", "accepted");
        assert!(sql.contains("\"status\" = ?"));
        assert!(sql.contains("datetime('now')"));
        // status value, id, pending guard
        assert_eq!(values.0.len(), 3);
    }

    #[test]
    fn list_for_user_binds_optional_status() {
        let (plain, plain_values) = list_for_user("u1", None);
        let (filtered, filtered_values) = list_for_user("u1", Some("pending"));
        assert!(!plain.contains("i.\"status\" = ?"));
        assert!(filtered.contains("i.\"status\" = ?"));
        assert_eq!(plain_values.0.len(), 1);
        assert_eq!(filtered_values.0.len(), 2);
    }
}
