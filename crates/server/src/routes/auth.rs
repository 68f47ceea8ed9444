use axum::{
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    Json,
};
use chrono::Utc;
use partyplanner_api::access::Actor;
use partyplanner_api::{
    service, LoginRequest, ServiceError, SignupRequest, TokenResponse, UserResponse, UserRole,
};

use crate::config::AppConfig;
use crate::error::ApiErr;
use crate::routes::blocking;
use crate::service::users::{self, NewUser};
use crate::storage::Db;

fn now_unix() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Authenticated user extracted from the `Authorization: Bearer <jwt>` header.
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id.clone(), self.role)
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Db: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = service::bearer_token(header)?;

        let config = AppConfig::from_ref(state);
        let user_id = service::resolve_access_token(token, &config.jwt_secret, now_unix())?;

        let db = Db::from_ref(state);
        let user = db
            .transact(|conn| users::get_user(conn, &user_id))
            .map_err(|e| match e {
                ServiceError::NotFound(_) => ApiErr::unauthorized("account no longer exists"),
                other => ApiErr::from(other),
            })?;

        Ok(Self {
            user_id: user.id,
            username: user.username,
            role: UserRole::from_admin_flag(user.is_admin),
        })
    }
}

// ---------------------------------------------------------------------------
// Signup / login
// ---------------------------------------------------------------------------

/// POST /api/auth/signup: register with username, email and password.
pub async fn signup(
    State(db): State<Db>,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiErr> {
    let new = blocking(move || NewUser::from_signup(&req)).await?;
    let user = db.transact(|conn| users::insert_user(conn, &new))?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login: exchange email and password for a bearer token.
pub async fn login(
    State(db): State<Db>,
    State(config): State<AppConfig>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiErr> {
    let creds = db.transact(|conn| users::find_credentials(conn, &req))?;
    let password = req.password;
    let user_id = blocking(move || users::authenticate(creds, &password)).await?;

    let token = service::issue_access_token(
        &config.jwt_secret,
        &user_id,
        now_unix(),
        config.token_ttl_secs,
    )?;
    tracing::debug!("login: {user_id}");
    Ok(Json(token))
}
