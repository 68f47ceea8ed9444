use anyhow::{Context, Result};
use partyplanner_api::{ServiceError, SignupRequest};

use crate::config::AdminSeed;
use crate::service::users::{self, NewUser};
use crate::storage::Db;

/// Make sure the configured admin account exists.
///
/// A new account is created with the admin role; an existing account with
/// that email is promoted and keeps its password. The username is `admin`,
/// or the email's local part when `admin` belongs to someone else. If no
/// candidate is free the seed is skipped with a warning.
pub fn seed_admin(db: &Db, seed: &AdminSeed) -> Result<()> {
    let email = partyplanner_api::service::validate_email(&seed.email)
        .map_err(|e| anyhow::anyhow!("invalid ADMIN_EMAIL: {e}"))?;

    if let Some(existing) = db
        .transact(|conn| users::find_by_email(conn, &email))
        .context("looking up admin account")?
    {
        if !existing.is_admin {
            db.transact(|conn| users::promote(conn, &existing.id))
                .context("promoting admin account")?;
            tracing::info!("promoted {} to admin", existing.email);
        }
        return Ok(());
    }

    let local_part = email.split('@').next().unwrap_or_default().to_string();
    let mut candidates = vec!["admin".to_string()];
    if !local_part.is_empty() && local_part != "admin" {
        candidates.push(local_part);
    }

    for username in candidates {
        let req = SignupRequest {
            username,
            email: email.clone(),
            password: seed.password.clone(),
        };
        let mut new =
            NewUser::from_signup(&req).map_err(|e| anyhow::anyhow!("invalid admin seed: {e}"))?;
        new.is_admin = true;
        match db.transact(|conn| users::insert_user(conn, &new)) {
            Ok(user) => {
                tracing::info!("admin account created: {} ({})", user.email, user.username);
                return Ok(());
            }
            Err(ServiceError::Conflict(msg)) if msg.contains("username") => {
                tracing::debug!("username {:?} taken, trying next", req.username);
            }
            Err(e) => return Err(e).context("creating admin account"),
        }
    }

    tracing::warn!("no free username for admin {email}, skipping admin seed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> AdminSeed {
        AdminSeed {
            email: "Root@Example.com".into(),
            password: "super-secret-pw".into(),
        }
    }

    #[test]
    fn creates_admin_once() {
        let db = Db::open_in_memory().unwrap();
        seed_admin(&db, &seed()).unwrap();
        seed_admin(&db, &seed()).unwrap();

        let admin = db
            .transact(|conn| users::find_by_email(conn, "root@example.com"))
            .unwrap()
            .expect("admin exists");
        assert!(admin.is_admin);
        assert_eq!(admin.username, "admin");
    }

    fn regular(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.into(),
            email: email.into(),
            password_hash: "00".into(),
            password_salt: "00".into(),
            is_admin: false,
        }
    }

    #[test]
    fn falls_back_to_email_local_part_when_admin_is_taken() {
        let db = Db::open_in_memory().unwrap();
        db.transact(|conn| users::insert_user(conn, &regular("admin", "admin@example.com")))
            .unwrap();

        seed_admin(&db, &seed()).unwrap();
        let admin = db
            .transact(|conn| users::find_by_email(conn, "root@example.com"))
            .unwrap()
            .expect("admin exists");
        assert!(admin.is_admin);
        assert_eq!(admin.username, "root");

        let squatter = db
            .transact(|conn| users::find_by_email(conn, "admin@example.com"))
            .unwrap()
            .unwrap();
        assert!(!squatter.is_admin);
    }

    #[test]
    fn skips_when_no_username_is_free() {
        let db = Db::open_in_memory().unwrap();
        db.transact(|conn| users::insert_user(conn, &regular("admin", "a@example.com")))
            .unwrap();
        db.transact(|conn| users::insert_user(conn, &regular("root", "b@example.com")))
            .unwrap();

        seed_admin(&db, &seed()).unwrap();
        let missing = db
            .transact(|conn| users::find_by_email(conn, "root@example.com"))
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn promotes_existing_account() {
        let db = Db::open_in_memory().unwrap();
        let existing = NewUser {
            username: "root".into(),
            email: "root@example.com".into(),
            password_hash: "00".into(),
            password_salt: "00".into(),
            is_admin: false,
        };
        db.transact(|conn| users::insert_user(conn, &existing)).unwrap();

        seed_admin(&db, &seed()).unwrap();
        let user = db
            .transact(|conn| users::find_by_email(conn, "root@example.com"))
            .unwrap()
            .unwrap();
        assert!(user.is_admin);
        assert_eq!(user.username, "root");
    }
}
