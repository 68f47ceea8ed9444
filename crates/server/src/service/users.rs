use partyplanner_api::access::{self, Actor};
use partyplanner_api::{
    crypto, db, service, LoginRequest, ServiceError, ServiceResult, SignupRequest,
    UpdateUserRequest, UserResponse,
};
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

use crate::storage::{
    is_constraint_violation, sq_count, sq_execute, sq_query_map, sq_query_row, user_from_row,
};

/// A validated account, password already hashed.
///
/// Hashing is slow, so it happens before the database lock is taken.
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub is_admin: bool,
}

impl NewUser {
    pub fn from_signup(req: &SignupRequest) -> ServiceResult<Self> {
        let username = service::validate_username(&req.username)?;
        let email = service::validate_email(&req.email)?;
        service::validate_password(&req.password)?;
        let (password_hash, password_salt) = crypto::hash_password(&req.password)?;
        Ok(Self {
            username,
            email,
            password_hash,
            password_salt,
            is_admin: false,
        })
    }
}

/// Validated profile changes for `PUT /api/user/me`.
#[derive(Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    /// (hash, salt)
    pub password: Option<(String, String)>,
}

impl ProfileUpdate {
    pub fn from_request(req: &UpdateUserRequest) -> ServiceResult<Self> {
        let username = req
            .username
            .as_deref()
            .map(service::validate_username)
            .transpose()?;
        let email = req
            .email
            .as_deref()
            .map(service::validate_email)
            .transpose()?;
        let password = match req.password.as_deref() {
            Some(password) => {
                service::validate_password(password)?;
                Some(crypto::hash_password(password)?)
            }
            None => None,
        };
        Ok(Self {
            username,
            email,
            password,
        })
    }
}

/// Stored credentials of the account owning an email.
#[derive(Clone)]
pub struct StoredCredentials {
    pub user_id: String,
    password_hash: String,
    password_salt: String,
}

// ── Lookups ────────────────────────────────────────────────────────────────

pub fn get_user(conn: &Connection, user_id: &str) -> ServiceResult<UserResponse> {
    sq_query_row(conn, db::users::get_by_id(user_id), user_from_row)
        .optional()
        .map_err(ServiceError::from_db("get user"))?
        .ok_or_else(|| ServiceError::NotFound("user not found".into()))
}

/// Lookup by an already normalized email.
pub fn find_by_email(conn: &Connection, email: &str) -> ServiceResult<Option<UserResponse>> {
    sq_query_row(conn, db::users::get_by_email(email), user_from_row)
        .optional()
        .map_err(ServiceError::from_db("find user by email"))
}

/// Admin only: every account.
pub fn list_users(conn: &Connection, actor: &Actor) -> ServiceResult<Vec<UserResponse>> {
    access::require_admin(actor)?;
    sq_query_map(conn, db::users::list_all(), user_from_row)
        .map_err(ServiceError::from_db("list users"))
}

// ── Signup / login ─────────────────────────────────────────────────────────

fn ensure_available(
    conn: &Connection,
    username: &str,
    email: &str,
    exclude_id: &str,
) -> ServiceResult<()> {
    let email_taken = sq_count(conn, db::users::email_taken(email, exclude_id))
        .map_err(ServiceError::from_db("check email"))?;
    if email_taken > 0 {
        return Err(ServiceError::Conflict("email already registered".into()));
    }
    let username_taken = sq_count(conn, db::users::username_taken(username, exclude_id))
        .map_err(ServiceError::from_db("check username"))?;
    if username_taken > 0 {
        return Err(ServiceError::Conflict("username already taken".into()));
    }
    Ok(())
}

/// Create an account. Duplicate email or username is a conflict.
pub fn insert_user(conn: &Connection, new: &NewUser) -> ServiceResult<UserResponse> {
    ensure_available(conn, &new.username, &new.email, "")?;

    let user_id = Uuid::new_v4().to_string();
    sq_execute(
        conn,
        db::users::insert(
            &user_id,
            &new.username,
            &new.email,
            &new.password_hash,
            &new.password_salt,
            new.is_admin,
        ),
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            ServiceError::Conflict("email or username already registered".into())
        } else {
            ServiceError::from_db("insert user")(e)
        }
    })?;

    tracing::info!("user registered: {} ({user_id})", new.username);
    get_user(conn, &user_id)
}

pub fn find_credentials(
    conn: &Connection,
    req: &LoginRequest,
) -> ServiceResult<Option<StoredCredentials>> {
    let Ok(email) = service::validate_email(&req.email) else {
        return Ok(None);
    };
    sq_query_row(conn, db::users::get_for_login(&email), |row| {
        Ok(StoredCredentials {
            user_id: row.get(0)?,
            password_hash: row.get(1)?,
            password_salt: row.get(2)?,
        })
    })
    .optional()
    .map_err(ServiceError::from_db("login lookup"))
}

/// Check a password against what [`find_credentials`] returned.
///
/// Unknown email and wrong password produce the same error and cost the
/// same key derivation, so timing does not reveal registered emails.
pub fn authenticate(creds: Option<StoredCredentials>, password: &str) -> ServiceResult<String> {
    let denied = || ServiceError::Unauthorized("invalid email or password".into());
    let Some(c) = creds else {
        crypto::verify_password(password, UNKNOWN_USER_HASH, UNKNOWN_USER_SALT);
        return Err(denied());
    };
    if crypto::verify_password(password, &c.password_hash, &c.password_salt) {
        Ok(c.user_id)
    } else {
        Err(denied())
    }
}

/// Well-formed hex so the derivation for unknown emails actually runs.
const UNKNOWN_USER_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";
const UNKNOWN_USER_SALT: &str = "00000000000000000000000000000000";

// ── Profile ────────────────────────────────────────────────────────────────

pub fn update_user(
    conn: &Connection,
    user_id: &str,
    update: &ProfileUpdate,
) -> ServiceResult<UserResponse> {
    let current = get_user(conn, user_id)?;
    let username = update.username.as_deref().unwrap_or(&current.username);
    let email = update.email.as_deref().unwrap_or(&current.email);

    if username != current.username || email != current.email {
        ensure_available(conn, username, email, user_id)?;
        sq_execute(conn, db::users::update_profile(user_id, username, email))
            .map_err(ServiceError::from_db("update profile"))?;
    }
    if let Some((hash, salt)) = &update.password {
        sq_execute(conn, db::users::update_password(user_id, hash, salt))
            .map_err(ServiceError::from_db("update password"))?;
    }

    get_user(conn, user_id)
}

/// Delete an account and its invitations. Refused while the user still
/// owns parties.
pub fn delete_user(conn: &Connection, user_id: &str) -> ServiceResult<()> {
    let user = get_user(conn, user_id)?;
    let owned = sq_count(conn, db::parties::count_created_by(user_id))
        .map_err(ServiceError::from_db("count parties"))?;
    if owned > 0 {
        return Err(ServiceError::Conflict(format!(
            "user still owns {owned} part{}; delete them first",
            if owned == 1 { "y" } else { "ies" }
        )));
    }

    sq_execute(conn, db::users::delete(user_id)).map_err(ServiceError::from_db("delete user"))?;
    tracing::info!("user deleted: {} ({user_id})", user.username);
    Ok(())
}

/// Admin only: delete any account.
pub fn admin_delete_user(conn: &Connection, actor: &Actor, user_id: &str) -> ServiceResult<()> {
    access::require_admin(actor)?;
    delete_user(conn, user_id)
}

/// Grant the admin role.
pub fn promote(conn: &Connection, user_id: &str) -> ServiceResult<()> {
    sq_execute(conn, db::users::set_admin(user_id, true))
        .map_err(ServiceError::from_db("promote user"))?;
    Ok(())
}
