//! Party planner HTTP server: parties, invitations, join requests and
//! reminder mails over Axum and SQLite.

pub mod config;
pub mod error;
pub mod mail;
pub mod reminder;
pub mod routes;
pub mod seed;
pub mod service;
pub mod storage;

use axum::{
    extract::FromRef,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::AppConfig;
use mail::Notifier;
use storage::Db;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Db,
    pub config: AppConfig,
    pub notifier: Notifier,
}

impl FromRef<AppState> for Db {
    fn from_ref(state: &AppState) -> Self {
        state.db.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Notifier {
    fn from_ref(state: &AppState) -> Self {
        state.notifier.clone()
    }
}

/// Build the full application router.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        // Health
        .route("/health", get(routes::health::health))
        // Auth
        .route("/auth/signup", post(routes::auth::signup))
        .route("/auth/login", post(routes::auth::login))
        // Users
        .route(
            "/user/me",
            get(routes::users::me)
                .put(routes::users::update_me)
                .delete(routes::users::delete_me),
        )
        .route("/user/invitations", get(routes::users::my_invitations))
        .route("/users/{id}", get(routes::users::get_user))
        // Admin
        .route("/admin/users", get(routes::admin::list_users))
        .route("/admin/users/{id}", delete(routes::admin::delete_user))
        // Parties
        .route(
            "/parties",
            get(routes::parties::list_parties).post(routes::parties::create_party),
        )
        .route(
            "/parties/{id}",
            get(routes::parties::get_party)
                .put(routes::parties::update_party)
                .delete(routes::parties::delete_party),
        )
        // Invitations and join requests
        .route("/parties/{id}/invitations", post(routes::parties::invite))
        .route(
            "/parties/{id}/respond-invite",
            put(routes::parties::respond_invite),
        )
        .route(
            "/parties/{id}/join-request",
            post(routes::parties::request_to_join),
        )
        .route(
            "/parties/{id}/join-requests/{user_id}",
            put(routes::parties::review_join_request),
        )
        .route(
            "/parties/{id}/attendees/{user_id}",
            delete(routes::parties::remove_attendee),
        );

    Router::new()
        .route("/", get(routes::health::root))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
