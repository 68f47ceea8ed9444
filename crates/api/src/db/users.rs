//! User query builders.

use sea_query::{Asterisk, Expr, Func, Order, Query, SqliteQueryBuilder};

use super::tables::Users;
use super::Built;

/// Columns read by every profile lookup, in row order:
/// id, username, email, is_admin, created_at.
fn profile_columns() -> [Users; 5] {
    [
        Users::Id,
        Users::Username,
        Users::Email,
        Users::IsAdmin,
        Users::CreatedAt,
    ]
}

// ── Lookups ────────────────────────────────────────────────────────────────

/// Find user profile by id.
pub fn get_by_id(user_id: &str) -> Built {
    Query::select()
        .columns(profile_columns())
        .from(Users::Table)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Find user profile by (normalized) email.
pub fn get_by_email(email: &str) -> Built {
    Query::select()
        .columns(profile_columns())
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// Find user by email for login (returns id, password_hash, password_salt).
pub fn get_for_login(email: &str) -> Built {
    Query::select()
        .columns([Users::Id, Users::PasswordHash, Users::PasswordSalt])
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .build(SqliteQueryBuilder)
}

/// All users, oldest first.
pub fn list_all() -> Built {
    Query::select()
        .columns(profile_columns())
        .from(Users::Table)
        .order_by(Users::CreatedAt, Order::Asc)
        .order_by(Users::Username, Order::Asc)
        .build(SqliteQueryBuilder)
}

/// Count users other than `exclude_id` holding `email`.
pub fn email_taken(email: &str, exclude_id: &str) -> Built {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Users::Table)
        .and_where(Expr::col(Users::Email).eq(email))
        .and_where(Expr::col(Users::Id).ne(exclude_id))
        .build(SqliteQueryBuilder)
}

/// Count users other than `exclude_id` holding `username`.
pub fn username_taken(username: &str, exclude_id: &str) -> Built {
    Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Users::Table)
        .and_where(Expr::col(Users::Username).eq(username))
        .and_where(Expr::col(Users::Id).ne(exclude_id))
        .build(SqliteQueryBuilder)
}

// ── Writes ─────────────────────────────────────────────────────────────────

/// Insert a user with a hashed password.
pub fn insert(
    id: &str,
    username: &str,
    email: &str,
    password_hash: &str,
    password_salt: &str,
    is_admin: bool,
) -> Built {
    Query::insert()
        .into_table(Users::Table)
        .columns([
            Users::Id,
            Users::Username,
            Users::Email,
            Users::PasswordHash,
            Users::PasswordSalt,
            Users::IsAdmin,
        ])
        .values_panic([
            id.into(),
            username.into(),
            email.into(),
            password_hash.into(),
            password_salt.into(),
            is_admin.into(),
        ])
        .build(SqliteQueryBuilder)
}

/// Update username and email.
pub fn update_profile(user_id: &str, username: &str, email: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::Username, username)
        .value(Users::Email, email)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Update password.
pub fn update_password(user_id: &str, password_hash: &str, password_salt: &str) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::PasswordHash, password_hash)
        .value(Users::PasswordSalt, password_salt)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Promote (or demote) a user.
pub fn set_admin(user_id: &str, is_admin: bool) -> Built {
    Query::update()
        .table(Users::Table)
        .value(Users::IsAdmin, is_admin)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}

/// Delete a user. Invitations cascade; owned parties block (RESTRICT).
pub fn delete(user_id: &str) -> Built {
    Query::delete()
        .from_table(Users::Table)
        .and_where(Expr::col(Users::Id).eq(user_id))
        .build(SqliteQueryBuilder)
}
