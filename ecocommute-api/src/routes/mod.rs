/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login and token refresh
/// - `commutes`: Weekly commute submission and recent logs
/// - `users`: User stats and points history
/// - `challenges`: Challenge listing, creation, joining and participations
/// - `rewards`: Reward catalogue and redemption
/// - `leaderboard`: Company leaderboard
///
/// Handlers that read or write a user's data accept an optional target user
/// (`userId` query parameter or `user_id` body field). Omitting it targets
/// the caller; naming anyone else requires the admin role.

pub mod auth;
pub mod challenges;
pub mod commutes;
pub mod health;
pub mod leaderboard;
pub mod rewards;
pub mod users;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use ecocommute_shared::{
    auth::{authorization::ensure_can_act_for, identity::Identity},
    models::user::User,
};
use serde::Deserialize;
use uuid::Uuid;

/// `?userId=` query parameter
#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<Uuid>,
}

/// Loads the authenticated caller
///
/// A valid token for a user that no longer exists is treated as
/// unauthenticated.
pub async fn caller(state: &AppState, identity: &Identity) -> ApiResult<User> {
    state
        .storage
        .get_user(identity.user_id)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Unknown user".to_string()))
}

/// Resolves the user a request acts for
///
/// Returns the caller itself when `requested` is None or names the caller.
///
/// # Errors
///
/// - `401` if the caller no longer exists
/// - `403` if the caller names another user without being an admin
/// - `404` if the named user doesn't exist
pub async fn acting_user(
    state: &AppState,
    identity: &Identity,
    requested: Option<Uuid>,
) -> ApiResult<User> {
    let caller = caller(state, identity).await?;
    let target = requested.unwrap_or(caller.id);
    if target == caller.id {
        return Ok(caller);
    }

    ensure_can_act_for(&caller, target)?;
    tracing::info!(admin_id = %caller.id, user_id = %target, "Admin acting for another user");

    state
        .storage
        .get_user(target)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}
