//! Shared API types, crypto, access rules, and SQL builders for the party planner.
//!
//! This crate is the **single source of truth** for all request/response
//! types. The Axum server imports them directly; nothing here depends on a
//! web framework.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod access;
#[cfg(feature = "backend")]
pub mod crypto;
#[cfg(feature = "backend")]
pub mod db;
#[cfg(feature = "backend")]
pub mod service;

// ─── Shared Enums ────────────────────────────────────────────────────────────

/// Account role. Stored as the `users.is_admin` flag.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Regular,
    Admin,
}

impl UserRole {
    pub fn from_admin_flag(is_admin: bool) -> Self {
        if is_admin { Self::Admin } else { Self::Regular }
    }

    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Regular => "regular",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a party invitation.
///
/// `Pending` is the only non-terminal state; see [`InvitationStatus::respond`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }

    /// Apply an accept/decline answer. Only `Pending` may transition.
    pub fn respond(self, accept: bool) -> Result<Self, ServiceError> {
        match self {
            Self::Pending if accept => Ok(Self::Accepted),
            Self::Pending => Ok(Self::Declined),
            other => Err(ServiceError::Conflict(format!(
                "invitation already {other}"
            ))),
        }
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvitationStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            other => Err(ServiceError::BadRequest(format!(
                "unknown invitation status: {other}"
            ))),
        }
    }
}

/// Who created an invitation: the party creator, or the user asking to join.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvitationOrigin {
    Invite,
    JoinRequest,
}

impl InvitationOrigin {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Invite => "invite",
            Self::JoinRequest => "join_request",
        }
    }
}

impl std::fmt::Display for InvitationOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvitationOrigin {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invite" => Ok(Self::Invite),
            "join_request" => Ok(Self::JoinRequest),
            other => Err(ServiceError::BadRequest(format!(
                "unknown invitation origin: {other}"
            ))),
        }
    }
}

// ─── Auth ────────────────────────────────────────────────────────────────────

/// Email + password registration.
#[derive(Debug, Serialize, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Email + password login.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Returned on successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
    pub expires_in: u64,
}

// ─── Users ───────────────────────────────────────────────────────────────────

/// Full user profile. Never carries credential material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: String,
}

/// Short user reference embedded in party payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

/// Partial profile update for `PUT /api/user/me`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListUsersResponse {
    pub users: Vec<UserResponse>,
}

// ─── Parties ─────────────────────────────────────────────────────────────────

/// Request body for `POST /api/parties`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreatePartyRequest {
    pub title: String,
    #[serde(default)]
    pub platform: String,
    #[serde(default)]
    pub description: String,
    /// RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]` read as UTC.
    pub scheduled_at: String,
    /// Registered users to invite right away. Unknown addresses are skipped.
    #[serde(default)]
    pub invite_emails: Vec<String>,
}

/// Partial update for `PUT /api/parties/:id`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdatePartyRequest {
    pub title: Option<String>,
    pub platform: Option<String>,
    pub description: Option<String>,
    pub scheduled_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyResponse {
    pub id: String,
    pub title: String,
    pub platform: String,
    pub description: String,
    pub scheduled_at: DateTime<Utc>,
    pub creator: UserSummary,
    /// Users whose invitation is accepted.
    pub attendees: Vec<UserSummary>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListPartiesResponse {
    pub parties: Vec<PartyResponse>,
}

/// Query parameters for `GET /api/parties`.
#[derive(Debug, Default, Deserialize)]
pub struct PartyListQuery {
    /// Only parties the caller created or attends.
    #[serde(default)]
    pub mine: bool,
}

// ─── Invitations ─────────────────────────────────────────────────────────────

/// Request body for `POST /api/parties/:id/invitations`.
#[derive(Debug, Serialize, Deserialize)]
pub struct InviteRequest {
    pub email: String,
}

/// Accept or decline. Used for both invitations and join requests.
#[derive(Debug, Serialize, Deserialize)]
pub struct RespondRequest {
    pub accept: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvitationResponse {
    pub id: String,
    pub party_id: String,
    pub user_id: String,
    pub status: InvitationStatus,
    pub origin: InvitationOrigin,
    pub created_at: String,
    pub responded_at: Option<String>,
}

/// An invitation addressed to the caller, joined with its party.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyInvitation {
    pub id: String,
    pub party_id: String,
    pub party_title: String,
    pub platform: String,
    pub scheduled_at: DateTime<Utc>,
    pub creator_username: String,
    pub status: InvitationStatus,
    pub origin: InvitationOrigin,
    pub created_at: String,
    pub responded_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListInvitationsResponse {
    pub invitations: Vec<MyInvitation>,
}

/// Query parameters for `GET /api/user/invitations`.
#[derive(Debug, Default, Deserialize)]
pub struct InvitationListQuery {
    pub status: Option<InvitationStatus>,
}

// ─── Misc ────────────────────────────────────────────────────────────────────

/// Generic success response for operations that don't return data.
#[derive(Debug, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

/// Body of `GET /`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of `GET /api/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ─── Service Error ───────────────────────────────────────────────────────────

/// Framework-agnostic service error.
///
/// Each variant maps to an HTTP status code. The server converts this into
/// its own response type; tests match on the variant directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Internal(m) => m,
        }
    }

    /// Build a closure that wraps a DB/IO error as `Internal`.
    pub fn from_db<E: std::fmt::Display>(context: &str) -> impl FnOnce(E) -> Self + '_ {
        move |e| Self::Internal(format!("{context}: {e}"))
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ServiceError {}

/// JSON error shape `{ "error": "..." }` returned by all error responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

impl From<&ServiceError> for ApiError {
    fn from(e: &ServiceError) -> Self {
        Self {
            error: e.message().to_string(),
        }
    }
}
