pub mod admin;
pub mod auth;
pub mod health;
pub mod parties;
pub mod users;

use partyplanner_api::{ServiceError, ServiceResult};

/// Run CPU-heavy work (password hashing) off the async workers.
pub(crate) async fn blocking<T, F>(f: F) -> ServiceResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ServiceResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Internal(format!("blocking task failed: {e}")))?
}
