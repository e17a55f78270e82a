/// User endpoints
///
/// - `GET /api/user/stats?userId=` - Totals for the dashboard
/// - `GET /api/points/history?userId=` - Points ledger, newest first

use super::{acting_user, UserQuery};
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use ecocommute_shared::{auth::identity::Identity, models::points::PointsTransaction};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct UserStats {
    pub user_id: Uuid,
    pub points_total: i32,
    pub streak_count: i32,

    /// Sum of `co2_saved_kg` over all of the user's logs
    pub total_co2_saved_kg: i64,

    pub challenges_completed: i64,
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<UserStats>> {
    let Query(query) = query?;
    let user = acting_user(&state, &identity, query.user_id).await?;

    let total_co2_saved_kg = state.storage.total_co2_saved(user.id).await?;
    let challenges_completed = state.storage.count_completed_challenges(user.id).await?;

    Ok(Json(UserStats {
        user_id: user.id,
        points_total: user.points_total,
        streak_count: user.streak_count,
        total_co2_saved_kg,
        challenges_completed,
    }))
}

pub async fn points_history(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    query: Result<Query<UserQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<PointsTransaction>>> {
    let Query(query) = query?;
    let user = acting_user(&state, &identity, query.user_id).await?;

    Ok(Json(state.storage.list_points_transactions(user.id).await?))
}
