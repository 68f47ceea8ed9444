//! Shared business logic: framework-agnostic pure functions.
//!
//! Route handlers and the service layer call these, keeping validation and
//! token handling out of the HTTP adapters.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::{ServiceError, TokenResponse};

// ─── Validation ─────────────────────────────────────────────────────────────

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_PLATFORM_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Validate and normalize an email address. Returns the lowercased, trimmed email.
pub fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    let valid_shape = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid_shape || email.len() > 254 || email.contains(char::is_whitespace) {
        return Err(ServiceError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

/// Validate a password (8-128 characters).
pub fn validate_password(password: &str) -> Result<(), ServiceError> {
    let len = password.chars().count();
    if len < 8 {
        return Err(ServiceError::BadRequest(
            "password must be at least 8 characters".into(),
        ));
    }
    if len > 128 {
        return Err(ServiceError::BadRequest(
            "password must be at most 128 characters".into(),
        ));
    }
    Ok(())
}

/// Validate and normalize a username. Returns the trimmed username.
pub fn validate_username(username: &str) -> Result<String, ServiceError> {
    let trimmed = username.trim().to_string();
    if trimmed.is_empty() || trimmed.chars().count() > 64 {
        return Err(ServiceError::BadRequest(
            "username must be 1-64 characters".into(),
        ));
    }
    Ok(trimmed)
}

/// Validate a party title. Returns the trimmed title.
pub fn validate_title(title: &str) -> Result<String, ServiceError> {
    let trimmed = title.trim().to_string();
    if trimmed.is_empty() {
        return Err(ServiceError::BadRequest("title must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::BadRequest(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(trimmed)
}

pub fn validate_platform(platform: &str) -> Result<String, ServiceError> {
    let trimmed = platform.trim().to_string();
    if trimmed.chars().count() > MAX_PLATFORM_LEN {
        return Err(ServiceError::BadRequest(format!(
            "platform must be at most {MAX_PLATFORM_LEN} characters"
        )));
    }
    Ok(trimmed)
}

pub fn validate_description(description: &str) -> Result<String, ServiceError> {
    let trimmed = description.trim().to_string();
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ServiceError::BadRequest(format!(
            "description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(trimmed)
}

/// Parse a party date/time.
///
/// Accepts RFC 3339 (any offset, normalized to UTC) or a naive
/// `YYYY-MM-DDTHH:MM[:SS]` / `YYYY-MM-DD HH:MM[:SS]` which is read as UTC.
/// Fractional seconds are dropped, matching what the database stores.
pub fn parse_schedule(input: &str) -> Result<DateTime<Utc>, ServiceError> {
    let input = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc).trunc_subsecs(0));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            ServiceError::BadRequest(format!("invalid date/time: {input:?}"))
        })
}

/// Normalize the `invite_emails` list: trimmed, lowercased, deduplicated,
/// original order kept. Malformed entries are a validation error.
pub fn normalize_invite_emails(emails: &[String]) -> Result<Vec<String>, ServiceError> {
    let mut out: Vec<String> = Vec::with_capacity(emails.len());
    for raw in emails {
        let email = validate_email(raw)?;
        if !out.contains(&email) {
            out.push(email);
        }
    }
    Ok(out)
}

// ─── Timestamps ─────────────────────────────────────────────────────────────

/// SQLite `datetime('now')` layout. Lexicographic order equals time order.
pub const DB_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a UTC instant the way the schema stores it.
pub fn to_db_timestamp(at: &DateTime<Utc>) -> String {
    at.format(DB_TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp column written by [`to_db_timestamp`] or `datetime('now')`.
pub fn from_db_timestamp(raw: &str) -> Result<DateTime<Utc>, ServiceError> {
    NaiveDateTime::parse_from_str(raw, DB_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| ServiceError::Internal(format!("bad stored timestamp {raw:?}: {e}")))
}

// ─── Auth Tokens ────────────────────────────────────────────────────────────

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: Option<&str>) -> Result<&str, ServiceError> {
    header
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ServiceError::Unauthorized("missing or invalid Authorization header".into())
        })
}

/// Resolve a bearer token into the user id it was issued for.
pub fn resolve_access_token(
    token: &str,
    jwt_secret: &str,
    now_unix: u64,
) -> Result<String, ServiceError> {
    if jwt_secret.is_empty() {
        return Err(ServiceError::Unauthorized(
            "JWT authentication not configured".into(),
        ));
    }
    crate::crypto::verify_jwt(token, jwt_secret, now_unix)
}

/// Sign an access token and build the login response.
pub fn issue_access_token(
    jwt_secret: &str,
    user_id: &str,
    now_unix: u64,
    ttl_secs: u64,
) -> Result<TokenResponse, ServiceError> {
    if jwt_secret.is_empty() {
        return Err(ServiceError::Internal("JWT_SECRET not configured".into()));
    }
    Ok(TokenResponse {
        access_token: crate::crypto::sign_jwt(user_id, jwt_secret, now_unix, ttl_secs),
        token_type: "bearer".to_string(),
        expires_in: ttl_secs,
    })
}
