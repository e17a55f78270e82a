/// Reward endpoints
///
/// # Endpoints
///
/// - `GET /api/rewards?userId=` - Global rewards plus the user's company's
/// - `POST /api/rewards` - Create a reward (admin only)
/// - `POST /api/rewards/:id/redeem?userId=` - Spend points on a reward
/// - `GET /api/rewards/redemptions?userId=` - The user's redemptions

use super::{acting_user, caller, UserQuery};
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use ecocommute_shared::{
    auth::{authorization::require_admin, identity::Identity},
    models::reward::{CreateReward, Redemption, Reward},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create reward request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRewardRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: Option<String>,

    #[validate(range(min = 1, max = 1000000, message = "cost_points must be 1-1000000"))]
    pub cost_points: i32,

    /// Total redemptions allowed across all users; None = unlimited
    #[validate(range(min = 1, message = "quantity_limit must be positive"))]
    pub quantity_limit: Option<i32>,

    #[serde(default)]
    pub global: bool,
}

/// Redemption result
#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResponse {
    pub redemption: Redemption,

    /// Balance after the deduction
    pub points_total: i32,
}

pub async fn list_rewards(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Reward>>> {
    let Query(query) = query?;
    let user = acting_user(&state, &identity, query.user_id).await?;

    Ok(Json(state.storage.list_rewards(user.company_id).await?))
}

/// Create a reward
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `403 Forbidden`: Caller isn't an admin
pub async fn create_reward(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    payload: Result<Json<CreateRewardRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Reward>)> {
    let admin = caller(&state, &identity).await?;
    require_admin(&admin)?;

    let Json(req) = payload?;
    req.validate()?;

    let reward = state
        .storage
        .create_reward(CreateReward {
            company_id: if req.global { None } else { admin.company_id },
            title: req.title,
            description: req.description,
            cost_points: req.cost_points,
            quantity_limit: req.quantity_limit,
        })
        .await?;

    tracing::info!(reward_id = %reward.id, admin_id = %admin.id, "Reward created");
    Ok((StatusCode::CREATED, Json(reward)))
}

/// Redeem a reward
///
/// The redemption row, the negative ledger entry and the balance deduction
/// are written together.
///
/// # Errors
///
/// - `400 Bad Request`: Not enough points
/// - `404 Not Found`: No such reward, or it belongs to another company
/// - `409 Conflict`: `quantity_limit` reached
pub async fn redeem_reward(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<(StatusCode, Json<RedeemResponse>)> {
    let Path(reward_id) = path?;
    let Query(query) = query?;
    let user = acting_user(&state, &identity, query.user_id).await?;

    let redemption = state.storage.redeem_reward(user.id, reward_id).await?;
    tracing::info!(reward_id = %reward_id, user_id = %user.id, "Reward redeemed");

    let points_total = state
        .storage
        .get_user(user.id)
        .await?
        .map(|u| u.points_total)
        .unwrap_or_default();

    Ok((
        StatusCode::CREATED,
        Json(RedeemResponse {
            redemption,
            points_total,
        }),
    ))
}

pub async fn list_redemptions(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Redemption>>> {
    let Query(query) = query?;
    let user = acting_user(&state, &identity, query.user_id).await?;

    Ok(Json(state.storage.list_redemptions(user.id).await?))
}
